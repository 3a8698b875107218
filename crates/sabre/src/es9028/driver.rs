//! ES9028PRO / ES9038PRO driver
//!
//! Identification reads the chip ID from the status register; both parts are
//! treated alike. All control registers read back, so writes are elided when
//! the chip already holds the value and verified afterwards.

use platform::{LogSink, RegisterBus};

use super::registers::*;
use crate::config::{ChannelMode, DacConfig};
use crate::device::{ChipType, DacDevice, Input};
use crate::error::DacError;
use crate::register_file::{Access, DeviceState, RegisterFile};

/// Input index (0 = input 1) fed to each DAC channel, as register pairs.
type InputMap = [(u8, u8); 4];

const MAP_MONO_LEFT: InputMap = [(0, 0); 4];
const MAP_MONO_RIGHT: InputMap = [(1, 1); 4];
const MAP_EIGHT_CHANNEL: InputMap = [(0, 1), (2, 3), (4, 5), (6, 7)];
const MAP_DUAL_LEFT: InputMap = [(0, 2); 4];
const MAP_DUAL_RIGHT: InputMap = [(1, 3); 4];

/// Decoded input status (register 100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalStatus {
    /// DoP stream detected on the I²S or S/PDIF input
    pub dop: bool,
    /// Valid S/PDIF frames decoded
    pub spdif: bool,
    /// Valid I²S frame and bit clocks
    pub i2s: bool,
    /// DSD decoder running as fallback
    pub dsd: bool,
}

/// Kind of signal being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalType {
    /// DSD over PCM
    Dop,
    /// S/PDIF
    Spdif,
    /// I²S
    I2s,
    /// Native DSD
    Dsd,
    /// Nothing decoded
    None,
}

impl SignalStatus {
    /// Decode the raw status byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            dop: bits & SIGNAL_DOP != 0,
            spdif: bits & SIGNAL_SPDIF != 0,
            i2s: bits & SIGNAL_I2S != 0,
            dsd: bits & SIGNAL_DSD != 0,
        }
    }

    /// The decoder in use. DoP wins over the carrier it arrives on.
    pub const fn signal_type(self) -> SignalType {
        if self.dop {
            SignalType::Dop
        } else if self.spdif {
            SignalType::Spdif
        } else if self.i2s {
            SignalType::I2s
        } else if self.dsd {
            SignalType::Dsd
        } else {
            SignalType::None
        }
    }
}

/// ES9028PRO / ES9038PRO DAC.
#[derive(Debug, Clone)]
pub struct Es9028 {
    regs: RegisterFile,
    config: DacConfig,
}

impl Es9028 {
    /// Device with the given static configuration. No bus activity.
    pub fn new(config: DacConfig) -> Self {
        Self {
            regs: RegisterFile::new(config.name, config.address.get(), Access::ReadBack),
            config,
        }
    }

    /// Static configuration.
    pub fn config(&self) -> &DacConfig {
        &self.config
    }

    /// Pulse the self-clearing soft-reset bit, then drop to uninitialised.
    ///
    /// The chip returns to its power-on register values, so the shadow is
    /// forgotten as well.
    pub fn soft_reset<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} soft reset", self.regs.tag()));
        let result = self
            .regs
            .write_unverified(bus, log, REG_SYSTEM, SYSTEM_SOFT_RESET);
        self.regs.reset(log);
        result
    }

    /// Time the signal must stay below the automute level before automute
    /// is flagged. 0 disables automute.
    pub fn set_automute_time<B, L>(&mut self, bus: &mut B, log: &L, time: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} setting automute time {}", self.regs.tag(), time));
        self.regs.write(bus, log, REG_AUTOMUTE_TIME, time)
    }

    /// Automute threshold in -dB. Only the low seven bits are used.
    pub fn set_automute_level<B, L>(&mut self, bus: &mut B, log: &L, level: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        if level > AUTOMUTE_LEVEL_MAX {
            log.warn(format_args!(
                "{} automute level {} limited to 7 bits",
                self.regs.tag(),
                level
            ));
        }
        let level = level & AUTOMUTE_LEVEL_MAX;
        log.info(format_args!("{} setting automute level {}", self.regs.tag(), level));
        self.regs.write(bus, log, REG_AUTOMUTE_LEVEL, level)
    }

    /// Input decoder status.
    pub fn signal_status<B, L>(&mut self, bus: &mut B, log: &L) -> Result<SignalStatus, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let bits = self.regs.read(bus, log, REG_SIGNAL_STATUS)?;
        Ok(SignalStatus::from_bits(bits))
    }

    /// Ratio between the master clock and the audio clock once locked.
    pub fn dpll_number<B, L>(&mut self, bus: &mut B, log: &L) -> Result<u32, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let [r0, r1, r2, r3] = REG_DPLL;
        let bytes = [
            self.regs.read(bus, log, r0)?,
            self.regs.read(bus, log, r1)?,
            self.regs.read(bus, log, r2)?,
            self.regs.read(bus, log, r3)?,
        ];
        Ok(u32::from_le_bytes(bytes))
    }

    /// Sample rate in Hz derived from the DPLL ratio and the configured
    /// master clock: `dpll × clock / 2³²`.
    pub fn sample_rate<B, L>(&mut self, bus: &mut B, log: &L) -> Result<u32, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let dpll = self.dpll_number(bus, log)?;
        Ok(dpll_to_hz(dpll, self.config.master_clock_hz, 32))
    }

    // ── Initialisation steps ─────────────────────────────────────────────────

    fn identify<B, L>(&mut self, bus: &mut B, log: &L) -> Result<ChipType, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.debug(format_args!("{} reading chip ID", self.regs.tag()));
        let id = self.regs.read(bus, log, REG_CHIP_STATUS)?.wrapping_shr(2);
        log.info(format_args!("{} chip ID is {:#08b}", self.regs.tag(), id));
        match id {
            CHIP_ID_ES9028PRO => Ok(ChipType::Es9028Pro),
            CHIP_ID_ES9038PRO => Ok(ChipType::Es9038Pro),
            id => Err(DacError::UnknownChip { id }),
        }
    }

    fn write_mode<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let mode = self.config.mode;
        log.info(format_args!("{} setting mode to {}", self.regs.tag(), mode.label()));
        let map = match mode {
            ChannelMode::Stereo => {
                return self.regs.write_bits(bus, log, REG_CHANNEL_CONFIG, STEREO_MODE);
            }
            ChannelMode::MonoLeft => MAP_MONO_LEFT,
            ChannelMode::MonoRight => MAP_MONO_RIGHT,
            ChannelMode::EightChannel => MAP_EIGHT_CHANNEL,
            ChannelMode::DualLeft => MAP_DUAL_LEFT,
            ChannelMode::DualRight => MAP_DUAL_RIGHT,
        };
        self.map_inputs(bus, log, &map)
    }

    fn map_inputs<B, L>(&mut self, bus: &mut B, log: &L, map: &InputMap) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.regs.write_bits(bus, log, REG_CHANNEL_CONFIG, MAPPED_MODE)?;
        for (&register, &(a, b)) in REG_INPUT_MAP.iter().zip(map.iter()) {
            self.regs
                .write(bus, log, register, (a & 0x0F).wrapping_shl(4) | (b & 0x0F))?;
        }
        Ok(())
    }

    fn write_phase<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        let bits = self.config.phase.channel_bits(true);
        log.info(format_args!("{} setting phase {:#010b}", self.regs.tag(), bits));
        self.regs.write(bus, log, REG_PHASE, bits)
    }

    fn configure<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.write_mode(bus, log)?;
        self.write_phase(bus, log)
    }
}

/// `dpll × clock / 2^shift`, saturating at `u32::MAX`.
pub(crate) fn dpll_to_hz(dpll: u32, clock_hz: u32, shift: u32) -> u32 {
    let hz = u64::from(dpll)
        .saturating_mul(u64::from(clock_hz))
        .wrapping_shr(shift);
    u32::try_from(hz).unwrap_or(u32::MAX)
}

impl DacDevice for Es9028 {
    fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    fn max_attenuation(&self) -> u8 {
        ATTENUATION_MAX
    }

    fn initialise<B, L>(&mut self, bus: &mut B, log: &L) -> Result<ChipType, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} initialising", self.regs.tag()));
        self.regs.set_state(log, DeviceState::Initialising);

        let chip = if self.regs.no_i2c() {
            ChipType::Simulated
        } else {
            match self.identify(bus, log) {
                Ok(chip) => chip,
                Err(err) => {
                    log.error(format_args!(
                        "{} initialisation failed - {}",
                        self.regs.tag(),
                        err
                    ));
                    self.regs.reset(log);
                    return Err(err);
                }
            }
        };
        self.regs.set_chip(chip);
        self.regs.set_state(log, DeviceState::Initialised);

        if let Err(err) = self.configure(bus, log) {
            log.error(format_args!(
                "{} initialisation failed - {}",
                self.regs.tag(),
                err
            ));
            self.regs.reset(log);
            return Err(err);
        }
        Ok(chip)
    }

    fn mute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} mute", self.regs.tag()));
        self.regs.write_bits(bus, log, REG_MUTE, MUTE_ON)
    }

    fn unmute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!("{} unmute", self.regs.tag()));
        self.regs.write_bits(bus, log, REG_MUTE, MUTE_OFF)
    }

    fn locked<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        Ok(self.regs.read(bus, log, REG_CHIP_STATUS)? & STATUS_LOCK != 0)
    }

    fn automuted<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        Ok(self.regs.read(bus, log, REG_CHIP_STATUS)? & STATUS_AUTOMUTE != 0)
    }

    fn select_input<B, L>(&mut self, bus: &mut B, log: &L, input: Input) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.info(format_args!(
            "{} setting input select to {}",
            self.regs.tag(),
            input.label()
        ));
        let pattern = match input {
            Input::Serial => INPUT_SERIAL,
            Input::Spdif => INPUT_SPDIF,
        };
        self.regs.write_bits(bus, log, REG_INPUT_SELECT, pattern)
    }

    fn set_attenuation<B, L>(&mut self, bus: &mut B, log: &L, attenuation: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        if attenuation > ATTENUATION_MAX {
            log.error(format_args!(
                "{} invalid attenuation {}",
                self.regs.tag(),
                attenuation
            ));
            return Err(DacError::InvalidSetting);
        }
        self.regs
            .write_bits(bus, log, REG_CHANNEL_CONFIG, VOLUME_USE_CHANNEL_1)?;
        self.regs.write(bus, log, REG_VOLUME_1, attenuation)
    }
}
