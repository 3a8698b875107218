//! ESS Sabre DAC drivers
//!
//! Register-level drivers for the ES9018 and the ES9028PRO / ES9038PRO,
//! written against the [`platform::RegisterBus`] seam.
//!
//! # Layout
//!
//! - [`register_file`] - shadowed, verified single-register access shared by
//!   every chip
//! - [`pattern`] - eight-symbol bit patterns (`"*****1**"`) for partial writes
//! - [`es9028`] / [`es9018`] - register maps and drivers
//! - [`device`] - the chip-independent [`DacDevice`] trait
//! - [`Sabre`] - either chip behind one type, for boards that mix them
//!
//! ```ignore
//! let mut dac = Es9028::new(DacConfig::new("main"));
//! dac.initialise(&mut bus, &log)?;
//! dac.set_attenuation(&mut bus, &log, 20)?;
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod device;
pub mod error;
pub mod es9018;
pub mod es9028;
pub mod pattern;
pub mod register_file;

pub use config::{ChannelMode, ChannelPhase, DacConfig, Phase};
pub use device::{ChipType, DacDevice, Input};
pub use error::DacError;
pub use es9018::Es9018;
pub use es9028::{Es9028, SignalStatus, SignalType};
pub use pattern::{BitPattern, PatternError};
pub use register_file::{Access, DeviceState, RegisterFile};

use platform::{LogSink, RegisterBus};

/// Either supported chip.
#[derive(Debug, Clone)]
pub enum Sabre {
    /// ES9018
    Es9018(Es9018),
    /// ES9028PRO or ES9038PRO
    Es9028(Es9028),
}

impl Sabre {
    /// Sample rate in Hz, from the chip's DPLL ratio.
    pub fn sample_rate<B, L>(&mut self, bus: &mut B, log: &L) -> Result<u32, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        match self {
            Self::Es9018(dac) => dac.sample_rate(bus, log),
            Self::Es9028(dac) => dac.sample_rate(bus, log),
        }
    }

    /// Automute trigger level (seven bits on both chips).
    pub fn set_automute_level<B, L>(&mut self, bus: &mut B, log: &L, level: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        match self {
            Self::Es9018(dac) => dac.set_automute_level(bus, log, level),
            Self::Es9028(dac) => dac.set_automute_level(bus, log, level),
        }
    }
}

impl From<Es9018> for Sabre {
    fn from(dac: Es9018) -> Self {
        Self::Es9018(dac)
    }
}

impl From<Es9028> for Sabre {
    fn from(dac: Es9028) -> Self {
        Self::Es9028(dac)
    }
}

macro_rules! delegate {
    ($self:ident, $dac:ident => $call:expr) => {
        match $self {
            Sabre::Es9018($dac) => $call,
            Sabre::Es9028($dac) => $call,
        }
    };
}

impl DacDevice for Sabre {
    fn registers(&self) -> &RegisterFile {
        delegate!(self, dac => dac.registers())
    }

    fn registers_mut(&mut self) -> &mut RegisterFile {
        delegate!(self, dac => dac.registers_mut())
    }

    fn max_attenuation(&self) -> u8 {
        delegate!(self, dac => dac.max_attenuation())
    }

    fn initialise<B, L>(&mut self, bus: &mut B, log: &L) -> Result<ChipType, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.initialise(bus, log))
    }

    fn mute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.mute(bus, log))
    }

    fn unmute<B, L>(&mut self, bus: &mut B, log: &L) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.unmute(bus, log))
    }

    fn locked<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.locked(bus, log))
    }

    fn automuted<B, L>(&mut self, bus: &mut B, log: &L) -> Result<bool, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.automuted(bus, log))
    }

    fn select_input<B, L>(&mut self, bus: &mut B, log: &L, input: Input) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.select_input(bus, log, input))
    }

    fn set_attenuation<B, L>(&mut self, bus: &mut B, log: &L, attenuation: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        delegate!(self, dac => dac.set_attenuation(bus, log, attenuation))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use platform::mocks::{RecordingSink, SimBus};

    #[test]
    fn test_mixed_chips_share_one_bus() {
        let mut bus = SimBus::new();
        bus.add_device(0x48);
        bus.add_device(0x49);
        bus.set_register(
            0x48,
            es9028::registers::REG_CHIP_STATUS,
            es9028::registers::CHIP_ID_ES9038PRO.wrapping_shl(2),
        );
        let log = RecordingSink::new();

        let mut dacs: [Sabre; 2] = [
            Es9028::new(DacConfig::new("left")).into(),
            Es9018::new(
                Es9018::default_config("right").with_address(platform::I2cAddress::new(0x49)),
            )
            .into(),
        ];
        let chips: Vec<ChipType> = dacs
            .iter_mut()
            .map(|dac| dac.initialise(&mut bus, &log).unwrap())
            .collect();
        assert_eq!(chips, vec![ChipType::Es9038Pro, ChipType::Es9018]);
        assert!(dacs.iter().all(DacDevice::is_initialised));
        let [left, right] = &dacs;
        assert_eq!(left.max_attenuation(), 124);
        assert_eq!(right.max_attenuation(), 255);
    }
}
