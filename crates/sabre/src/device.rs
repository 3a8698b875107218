//! Chip-independent DAC device interface.

use core::fmt;

use platform::{LogSink, RegisterBus};

use crate::error::DacError;
use crate::register_file::{DeviceState, RegisterFile};

/// Chip variant, fixed once identification succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipType {
    /// Not identified yet
    Unknown,
    /// ES9018 (Sabre32 Reference)
    Es9018,
    /// ES9028PRO
    Es9028Pro,
    /// ES9038PRO, register compatible with the ES9028PRO
    Es9038Pro,
    /// Bus bypassed with `no_i2c`; no chip was read
    Simulated,
}

impl ChipType {
    /// Part name for logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Es9018 => "ES9018",
            Self::Es9028Pro => "ES9028PRO",
            Self::Es9038Pro => "ES9038PRO",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for ChipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audio input feeding the DAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Input {
    /// I²S / serial input
    #[default]
    Serial,
    /// S/PDIF input
    Spdif,
}

impl Input {
    /// The other input.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Serial => Self::Spdif,
            Self::Spdif => Self::Serial,
        }
    }

    /// Human-readable name for logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Spdif => "SPDIF",
        }
    }
}

/// A Sabre DAC reachable over a register bus.
///
/// Devices do not own the bus or the log sink; both are lent for each call
/// so that one controller can drive several devices over the same bus.
/// Every register operation fails with [`DacError::NotInitialised`] until
/// [`initialise`](Self::initialise) succeeds.
pub trait DacDevice {
    /// Register access state.
    fn registers(&self) -> &RegisterFile;

    /// Mutable register access state, for device-specific configuration.
    fn registers_mut(&mut self) -> &mut RegisterFile;

    /// Largest attenuation value the chip accepts.
    fn max_attenuation(&self) -> u8;

    /// Identify the chip, then write channel mode and phase.
    ///
    /// On any failure the device is left uninitialised and the error of the
    /// failing step is returned.
    fn initialise<B, L>(&mut self, bus: &mut B, log: &L) -> Result<ChipType, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    /// Mute every channel.
    fn mute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    /// Unmute every channel.
    fn unmute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    /// DPLL lock. `Err` means the status could not be read, which is not the
    /// same as `Ok(false)`.
    fn locked<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    /// Automute condition, with the same error distinction as
    /// [`locked`](Self::locked).
    fn automuted<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    /// Route `input` to the DACs.
    fn select_input<B, L>(&mut self, bus: &mut B, log: &L, input: Input) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    /// Apply the same attenuation to every channel.
    ///
    /// Values above [`max_attenuation`](Self::max_attenuation) are rejected
    /// with [`DacError::InvalidSetting`]; callers clamp first.
    fn set_attenuation<B, L>(&mut self, bus: &mut B, log: &L, attenuation: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink;

    // ── Provided ─────────────────────────────────────────────────────────────

    /// Device name.
    fn name(&self) -> &'static str {
        self.registers().name()
    }

    /// 7-bit bus address.
    fn address(&self) -> u8 {
        self.registers().address()
    }

    /// Identified chip.
    fn chip(&self) -> ChipType {
        self.registers().chip()
    }

    /// Lifecycle state.
    fn state(&self) -> DeviceState {
        self.registers().state()
    }

    /// True once initialisation has succeeded.
    fn is_initialised(&self) -> bool {
        self.state() == DeviceState::Initialised
    }

    /// Read one register.
    fn read_register<B, L>(&mut self, bus: &mut B, log: &L, register: u8) -> Result<u8, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.registers_mut().read(bus, log, register)
    }

    /// Write one register; see [`RegisterFile::write`].
    fn write_register<B, L>(&mut self, bus: &mut B, log: &L, register: u8, value: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.registers_mut().write(bus, log, register, value)
    }

    /// Patch bits with an eight-symbol `0`/`1`/`*` pattern; see
    /// [`RegisterFile::write_bits`].
    fn write_register_bits<B, L>(
        &mut self,
        bus: &mut B,
        log: &L,
        register: u8,
        pattern: &str,
    ) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.registers_mut().write_bits(bus, log, register, pattern)
    }

    /// Bus bypass flag.
    fn no_i2c(&self) -> bool {
        self.registers().no_i2c()
    }

    /// Enable or disable bus bypass.
    fn set_no_i2c(&mut self, on: bool) {
        self.registers_mut().set_no_i2c(on);
    }

    /// Force the device uninitialised and forget its shadow registers.
    ///
    /// Nothing is sent to the chip.
    fn reset<L: LogSink>(&mut self, log: &L) {
        self.registers_mut().reset(log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_toggles() {
        assert_eq!(Input::Serial.toggled(), Input::Spdif);
        assert_eq!(Input::Spdif.toggled(), Input::Serial);
    }

    #[test]
    fn test_chip_labels() {
        assert_eq!(ChipType::Es9038Pro.to_string(), "ES9038PRO");
        assert_eq!(ChipType::Simulated.label(), "simulated");
    }
}
