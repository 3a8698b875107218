//! Static device configuration, fixed before any bus activity.

use platform::I2cAddress;

/// How the chip's eight DACs are fed from the input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelMode {
    /// Every DAC plays the left input
    MonoLeft,
    /// Every DAC plays the right input
    MonoRight,
    /// Left/right pairs
    Stereo,
    /// Each DAC plays its own input
    #[default]
    EightChannel,
    /// Left inputs only, alternating between two sources (ES9028 family)
    DualLeft,
    /// Right inputs only, alternating between two sources (ES9028 family)
    DualRight,
}

impl ChannelMode {
    /// Human-readable name for logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::MonoLeft => "mono left",
            Self::MonoRight => "mono right",
            Self::Stereo => "stereo",
            Self::EightChannel => "8 channel",
            Self::DualLeft => "dual left",
            Self::DualRight => "dual right",
        }
    }
}

/// Output polarity of a channel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Normal polarity
    #[default]
    InPhase,
    /// Inverted polarity
    AntiPhase,
}

/// Polarity of odd (1, 3, 5, 7) and even (2, 4, 6, 8) DAC channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelPhase {
    /// Channels 1, 3, 5, 7
    pub odd: Phase,
    /// Channels 2, 4, 6, 8
    pub even: Phase,
}

impl ChannelPhase {
    /// Both groups in phase.
    pub const IN_PHASE: Self = Self {
        odd: Phase::InPhase,
        even: Phase::InPhase,
    };

    /// Explicit polarity per group.
    pub const fn new(odd: Phase, even: Phase) -> Self {
        Self { odd, even }
    }

    /// Register value with one bit per channel (bit 0 = channel 1).
    ///
    /// With `all_channels` false only channels 1, 2, 5, 6 are set: in the
    /// paired modes channels 3, 4, 7, 8 copy their neighbours and inherit
    /// the polarity.
    pub const fn channel_bits(self, all_channels: bool) -> u8 {
        let (odd, even) = if all_channels {
            (0x55, 0xAA)
        } else {
            (0x11, 0x22)
        };
        let odd = match self.odd {
            Phase::AntiPhase => odd,
            Phase::InPhase => 0,
        };
        let even = match self.even {
            Phase::AntiPhase => even,
            Phase::InPhase => 0,
        };
        odd | even
    }
}

/// Per-device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacConfig {
    /// Name used in log lines
    pub name: &'static str,
    /// 7-bit bus address
    pub address: I2cAddress,
    /// Channel routing written at initialisation
    pub mode: ChannelMode,
    /// Channel polarity written at initialisation
    pub phase: ChannelPhase,
    /// Master clock feeding the chip, used to convert DPLL ratios to Hz
    pub master_clock_hz: u32,
}

impl DacConfig {
    /// Address with the ADDR pin tied low.
    pub const DEFAULT_ADDRESS: I2cAddress = I2cAddress::new(0x48);

    /// Eight-channel, in phase, at the default address and a 100 MHz clock.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            address: Self::DEFAULT_ADDRESS,
            mode: ChannelMode::EightChannel,
            phase: ChannelPhase::IN_PHASE,
            master_clock_hz: 100_000_000,
        }
    }

    /// Set the bus address.
    #[must_use]
    pub const fn with_address(mut self, address: I2cAddress) -> Self {
        self.address = address;
        self
    }

    /// Set the channel mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ChannelMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the channel phase.
    #[must_use]
    pub const fn with_phase(mut self, phase: ChannelPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Set the master clock frequency.
    #[must_use]
    pub const fn with_master_clock_hz(mut self, hz: u32) -> Self {
        self.master_clock_hz = hz;
        self
    }
}
