//! Verified register access with a shadow copy
//!
//! [`RegisterFile`] is the per-device half of the register protocol. It does
//! not own the bus; every operation borrows a [`RegisterBus`] and a
//! [`LogSink`] for its duration, so several devices can share one bus owned by
//! the controller.
//!
//! # Write protocol
//!
//! 1. If the shadow holds the requested value and is clean, nothing is sent.
//! 2. Otherwise the current chip value is read. If it already matches, the
//!    shadow is refreshed and nothing is written.
//! 3. Otherwise the value is written and read back. A mismatch leaves the
//!    shadow dirty and fails with [`DacError::Verify`].
//!
//! Write-only register banks (the ES9018 control registers) skip the reads:
//! the shadow is the only record of chip content, seeded with the power-on
//! defaults via [`RegisterFile::preset`].
//!
//! # Simulation
//!
//! With `no_i2c` set nothing reaches the bus. Writes land in the shadow and
//! reads return the shadow value, or [`NO_I2C_SENTINEL`] for registers never
//! written.

use core::fmt;

use heapless::LinearMap;
use platform::{BusError, LogSink, RegisterBus};

use crate::device::ChipType;
use crate::error::DacError;
use crate::pattern::BitPattern;

/// Value returned by simulated reads of a register never written.
pub const NO_I2C_SENTINEL: u8 = 0x00;

/// Number of registers the shadow can track per device.
pub const SHADOW_CAPACITY: usize = 32;

/// Driver-side lifecycle of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Power-on, reset or failed initialisation; register access is refused
    Uninitialised,
    /// Identification in progress
    Initialising,
    /// Identified and configured
    Initialised,
}

/// How the chip's control registers can be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Registers read back, so writes are elided and verified
    ReadBack,
    /// Registers cannot be read; the shadow stands in for chip content
    WriteOnly,
}

/// Shadow entry for one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Shadow {
    /// Last value written (or confirmed on the chip)
    pub value: u8,
    /// Chip content may differ from `value`
    pub dirty: bool,
}

/// Register access state for one device.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    name: &'static str,
    address: u8,
    chip: ChipType,
    access: Access,
    state: DeviceState,
    no_i2c: bool,
    shadow: LinearMap<u8, Shadow, SHADOW_CAPACITY>,
}

impl RegisterFile {
    /// Empty register file for the device at `address`.
    pub fn new(name: &'static str, address: u8, access: Access) -> Self {
        Self {
            name,
            address,
            chip: ChipType::Unknown,
            access,
            state: DeviceState::Uninitialised,
            no_i2c: false,
            shadow: LinearMap::new(),
        }
    }

    /// Device name used in log lines.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 7-bit bus address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Identified chip, [`ChipType::Unknown`] before identification.
    pub fn chip(&self) -> ChipType {
        self.chip
    }

    /// Record the identified chip.
    pub fn set_chip(&mut self, chip: ChipType) {
        self.chip = chip;
    }

    /// Lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Move to `state`, logging the transition.
    pub fn set_state<L: LogSink>(&mut self, log: &L, state: DeviceState) {
        if self.state != state {
            let label = match state {
                DeviceState::Uninitialised => "uninitialised",
                DeviceState::Initialising => "initialising",
                DeviceState::Initialised => "initialised",
            };
            log.info(format_args!("{} {}", self.tag(), label));
        }
        self.state = state;
    }

    /// Bypass the bus.
    pub fn no_i2c(&self) -> bool {
        self.no_i2c
    }

    /// Enable or disable bus bypass.
    ///
    /// Any change marks the whole shadow dirty: simulated writes never reached
    /// the chip, and real writes made before bypass may since be stale.
    pub fn set_no_i2c(&mut self, on: bool) {
        if self.no_i2c != on {
            for (_, entry) in self.shadow.iter_mut() {
                entry.dirty = true;
            }
        }
        self.no_i2c = on;
    }

    /// Shadow entry for `register`, if one is held.
    pub fn shadow(&self, register: u8) -> Option<Shadow> {
        self.shadow.get(&register).copied()
    }

    /// Seed the shadow with a known power-on value, marked dirty so the first
    /// write always reaches the chip.
    pub fn preset(&mut self, register: u8, value: u8) {
        self.remember(register, value, true);
    }

    /// Drop every shadow entry; chip content is unknown again.
    pub fn forget(&mut self) {
        self.shadow.clear();
    }

    /// Drop to [`DeviceState::Uninitialised`] and forget the shadow.
    pub fn reset<L: LogSink>(&mut self, log: &L) {
        self.set_state(log, DeviceState::Uninitialised);
        self.forget();
    }

    /// Prefix identifying this device in log lines.
    pub fn tag(&self) -> Tag<'_> {
        Tag(self)
    }

    // ── Register operations ──────────────────────────────────────────────────

    /// Read one register.
    pub fn read<B, L>(&mut self, bus: &mut B, log: &L, register: u8) -> Result<u8, DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.ensure_ready(log, register, "reading")?;
        if self.no_i2c {
            return Ok(self
                .shadow(register)
                .map_or(NO_I2C_SENTINEL, |entry| entry.value));
        }
        bus.read_register(self.address, register).map_err(|source| {
            match source {
                BusError::Timeout => log.error(format_args!(
                    "{} timeout reading register {}",
                    self.tag(),
                    register
                )),
                _ => log.error(format_args!(
                    "{} error reading register {} - {}",
                    self.tag(),
                    register,
                    source
                )),
            }
            DacError::Bus { register, source }
        })
    }

    /// Write one register, eliding redundant writes and verifying the result.
    pub fn write<B, L>(
        &mut self,
        bus: &mut B,
        log: &L,
        register: u8,
        value: u8,
    ) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.ensure_ready(log, register, "writing")?;
        if self.no_i2c {
            self.remember(register, value, false);
            return Ok(());
        }
        if self.is_clean(register, value) {
            log.debug(format_args!(
                "{} register {} already {:#010b}",
                self.tag(),
                register,
                value
            ));
            return Ok(());
        }
        if self.access == Access::ReadBack {
            let current = self.read(bus, log, register)?;
            if current == value {
                log.debug(format_args!(
                    "{} register {} already {:#010b}",
                    self.tag(),
                    register,
                    value
                ));
                self.remember(register, value, false);
                return Ok(());
            }
        }
        self.store(bus, log, register, value)
    }

    /// Patch the bits named by an eight-symbol pattern (see [`BitPattern`]).
    ///
    /// A malformed pattern fails before any bus traffic. An all-`*` pattern,
    /// or one that leaves the value unchanged, sends no write.
    pub fn write_bits<B, L>(
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
        let bits = BitPattern::parse(pattern).map_err(|source| {
            log.error(format_args!(
                "{} bad pattern \"{}\" for register {} - {}",
                self.tag(),
                pattern,
                register,
                source
            ));
            DacError::InvalidPattern { register, source }
        })?;
        self.ensure_ready(log, register, "writing")?;
        if bits.is_noop() {
            return Ok(());
        }

        let (current, confirmed) = if self.no_i2c {
            self.shadow(register)
                .map_or((NO_I2C_SENTINEL, false), |entry| (entry.value, !entry.dirty))
        } else if self.access == Access::WriteOnly {
            let Some(entry) = self.shadow(register) else {
                log.error(format_args!(
                    "{} register {} content unknown, cannot apply {}",
                    self.tag(),
                    register,
                    bits
                ));
                return Err(DacError::UnknownContent { register });
            };
            (entry.value, !entry.dirty)
        } else {
            (self.read(bus, log, register)?, true)
        };
        let next = bits.apply(current);

        if self.no_i2c {
            self.remember(register, next, false);
            return Ok(());
        }
        if next == current && confirmed {
            log.debug(format_args!(
                "{} register {} unchanged by {}",
                self.tag(),
                register,
                bits
            ));
            self.remember(register, next, false);
            return Ok(());
        }
        self.store(bus, log, register, next)
    }

    /// Write without eliding or verifying. Used for self-clearing bits such
    /// as a soft reset, whose read-back never matches.
    pub fn write_unverified<B, L>(
        &mut self,
        bus: &mut B,
        log: &L,
        register: u8,
        value: u8,
    ) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        self.ensure_ready(log, register, "writing")?;
        if self.no_i2c {
            return Ok(());
        }
        bus.write_register(self.address, register, value)
            .map_err(|source| self.write_failed(log, register, source))
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn store<B, L>(&mut self, bus: &mut B, log: &L, register: u8, value: u8) -> Result<(), DacError>
    where
        B: RegisterBus + ?Sized,
        L: LogSink,
    {
        log.debug(format_args!(
            "{} writing {:#010b} to register {}",
            self.tag(),
            value,
            register
        ));
        if let Err(source) = bus.write_register(self.address, register, value) {
            self.remember(register, value, true);
            return Err(self.write_failed(log, register, source));
        }
        if self.access == Access::WriteOnly {
            self.remember(register, value, false);
            return Ok(());
        }

        let read = match self.read(bus, log, register) {
            Ok(read) => read,
            Err(err) => {
                self.remember(register, value, true);
                log.error(format_args!(
                    "{} could not read back register {}",
                    self.tag(),
                    register
                ));
                return Err(err);
            }
        };
        if read == value {
            self.remember(register, value, false);
            Ok(())
        } else {
            self.remember(register, value, true);
            log.error(format_args!(
                "{} write error - {:#010b} read from register {}, expected {:#010b}",
                self.tag(),
                read,
                register,
                value
            ));
            Err(DacError::Verify {
                register,
                wrote: value,
                read,
            })
        }
    }

    fn write_failed<L: LogSink>(&self, log: &L, register: u8, source: BusError) -> DacError {
        log.error(format_args!(
            "{} error writing register {} - {}",
            self.tag(),
            register,
            source
        ));
        DacError::Bus { register, source }
    }

    fn ensure_ready<L: LogSink>(&self, log: &L, register: u8, action: &str) -> Result<(), DacError> {
        if self.state == DeviceState::Uninitialised {
            log.error(format_args!(
                "{} uninitialised error {} register {}",
                self.tag(),
                action,
                register
            ));
            return Err(DacError::NotInitialised { register });
        }
        Ok(())
    }

    fn is_clean(&self, register: u8, value: u8) -> bool {
        self.shadow(register)
            .is_some_and(|entry| !entry.dirty && entry.value == value)
    }

    fn remember(&mut self, register: u8, value: u8, dirty: bool) {
        // A full map only costs a redundant bus write later.
        let _ = self.shadow.insert(register, Shadow { value, dirty });
    }
}

/// Log prefix of the form `name [CHIP @0xNN]`.
pub struct Tag<'a>(&'a RegisterFile);

impl fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} @0x{:02X}]",
            self.0.name,
            self.0.chip.label(),
            self.0.address
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use platform::mocks::{BusOp, RecordingSink, SimBus};

    const ADDR: u8 = 0x48;

    fn setup(access: Access) -> (RegisterFile, SimBus, RecordingSink) {
        let mut regs = RegisterFile::new("test", ADDR, access);
        let log = RecordingSink::new();
        regs.set_state(&log, DeviceState::Initialised);
        let mut bus = SimBus::new();
        bus.add_device(ADDR);
        (regs, bus, log)
    }

    #[test]
    fn test_uninitialised_access_is_refused_without_traffic() {
        let mut regs = RegisterFile::new("test", ADDR, Access::ReadBack);
        let mut bus = SimBus::new();
        bus.add_device(ADDR);
        let log = RecordingSink::new();

        assert_eq!(
            regs.read(&mut bus, &log, 64),
            Err(DacError::NotInitialised { register: 64 })
        );
        assert_eq!(
            regs.write(&mut bus, &log, 7, 1),
            Err(DacError::NotInitialised { register: 7 })
        );
        assert!(bus.ops().is_empty());
        assert!(log.contains("uninitialised error reading register 64"));
    }

    #[test]
    fn test_reads_allowed_while_initialising() {
        let mut regs = RegisterFile::new("test", ADDR, Access::ReadBack);
        let mut bus = SimBus::new();
        bus.add_device(ADDR);
        bus.set_register(ADDR, 64, 0xA0);
        let log = RecordingSink::new();
        regs.set_state(&log, DeviceState::Initialising);
        assert_eq!(regs.read(&mut bus, &log, 64).unwrap(), 0xA0);
    }

    #[test]
    fn test_write_reads_writes_and_verifies() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.write(&mut bus, &log, 16, 0x40).unwrap();
        assert_eq!(
            bus.ops(),
            &[
                BusOp::Read { address: ADDR, register: 16 },
                BusOp::Write { address: ADDR, register: 16, value: 0x40 },
                BusOp::Read { address: ADDR, register: 16 },
            ]
        );
        assert_eq!(regs.shadow(16), Some(Shadow { value: 0x40, dirty: false }));
    }

    #[test]
    fn test_write_is_elided_when_shadow_is_clean() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.write(&mut bus, &log, 16, 0x40).unwrap();
        bus.clear_ops();
        regs.write(&mut bus, &log, 16, 0x40).unwrap();
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_write_is_elided_when_chip_already_matches() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        bus.set_register(ADDR, 5, 0x68);
        regs.write(&mut bus, &log, 5, 0x68).unwrap();
        assert!(bus.writes_to(ADDR).is_empty());
        assert_eq!(regs.shadow(5), Some(Shadow { value: 0x68, dirty: false }));
    }

    #[test]
    fn test_verify_mismatch_marks_shadow_dirty() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        bus.ignore_writes(ADDR, 7);
        assert_eq!(
            regs.write(&mut bus, &log, 7, 1),
            Err(DacError::Verify { register: 7, wrote: 1, read: 0 })
        );
        assert_eq!(regs.shadow(7), Some(Shadow { value: 1, dirty: true }));

        // A dirty shadow never elides the next attempt.
        bus.clear_faults(ADDR);
        bus.clear_ops();
        regs.write(&mut bus, &log, 7, 1).unwrap();
        assert_eq!(bus.writes_to(ADDR), vec![(7, 1)]);
    }

    #[test]
    fn test_bus_error_is_reported_with_register() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        bus.fail_writes(ADDR, BusError::DataNack);
        assert_eq!(
            regs.write(&mut bus, &log, 15, 4),
            Err(DacError::Bus { register: 15, source: BusError::DataNack })
        );
        assert!(log.contains("error writing register 15"));
    }

    #[test]
    fn test_timeout_is_logged_distinctly() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        bus.fail_reads(ADDR, 64, BusError::Timeout);
        let err = regs.read(&mut bus, &log, 64).unwrap_err();
        assert!(err.is_timeout());
        assert!(log.contains("timeout reading register 64"));

        bus.fail_reads(ADDR, 64, BusError::AddressNack);
        let _ = regs.read(&mut bus, &log, 64);
        assert!(log.contains("error reading register 64 - received NACK on transmit of address"));
    }

    #[test]
    fn test_write_bits_patches_current_value() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        bus.set_register(ADDR, 15, 0b1000_0001);
        regs.write_bits(&mut bus, &log, 15, "*****1**").unwrap();
        assert_eq!(bus.register(ADDR, 15), 0b1000_0101);
    }

    #[test]
    fn test_write_bits_without_change_sends_no_write() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        bus.set_register(ADDR, 1, 0b0000_0001);
        regs.write_bits(&mut bus, &log, 1, "******01").unwrap();
        assert!(bus.writes_to(ADDR).is_empty());
    }

    #[test]
    fn test_all_wildcard_pattern_touches_nothing() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.write_bits(&mut bus, &log, 1, "********").unwrap();
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_invalid_pattern_fails_without_traffic() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        let err = regs.write_bits(&mut bus, &log, 1, "*****2**").unwrap_err();
        assert!(matches!(err, DacError::InvalidPattern { register: 1, .. }));
        let err = regs.write_bits(&mut bus, &log, 1, "****").unwrap_err();
        assert!(matches!(err, DacError::InvalidPattern { register: 1, .. }));
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_no_i2c_simulates_success() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.set_no_i2c(true);
        assert_eq!(regs.read(&mut bus, &log, 64).unwrap(), NO_I2C_SENTINEL);
        regs.write(&mut bus, &log, 16, 0x33).unwrap();
        assert_eq!(regs.read(&mut bus, &log, 16).unwrap(), 0x33);
        regs.write_bits(&mut bus, &log, 16, "1*******").unwrap();
        assert_eq!(regs.read(&mut bus, &log, 16).unwrap(), 0xB3);
        regs.write_unverified(&mut bus, &log, 0, 1).unwrap();
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_write_only_bank_uses_shadow() {
        let (mut regs, mut bus, log) = setup(Access::WriteOnly);
        regs.preset(10, 0xCE);

        regs.write_bits(&mut bus, &log, 10, "*******1").unwrap();
        assert_eq!(
            bus.ops(),
            &[BusOp::Write { address: ADDR, register: 10, value: 0xCF }]
        );

        bus.clear_ops();
        regs.write_bits(&mut bus, &log, 10, "*******1").unwrap();
        assert!(bus.ops().is_empty());
    }

    #[test]
    fn test_write_only_patch_needs_known_content() {
        let (mut regs, mut bus, log) = setup(Access::WriteOnly);
        assert_eq!(
            regs.write_bits(&mut bus, &log, 11, "******1*"),
            Err(DacError::UnknownContent { register: 11 })
        );
        assert!(bus.ops().is_empty());
        assert!(log.contains("register 11 content unknown"));

        // A whole-register write records the content, after which patches work.
        regs.write(&mut bus, &log, 11, 0b1000_0101).unwrap();
        regs.write_bits(&mut bus, &log, 11, "******1*").unwrap();
        assert_eq!(bus.register(ADDR, 11), 0b1000_0111);
    }

    #[test]
    fn test_leaving_no_i2c_does_not_trust_simulated_writes() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.set_no_i2c(true);
        regs.write(&mut bus, &log, 7, 1).unwrap();
        regs.set_no_i2c(false);
        assert_eq!(regs.shadow(7), Some(Shadow { value: 1, dirty: true }));

        regs.write(&mut bus, &log, 7, 1).unwrap();
        assert_eq!(bus.writes_to(ADDR), vec![(7, 1)]);
        assert_eq!(bus.register(ADDR, 7), 1);
    }

    #[test]
    fn test_entering_no_i2c_marks_real_shadow_dirty() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.write(&mut bus, &log, 16, 0x40).unwrap();
        regs.set_no_i2c(true);
        regs.set_no_i2c(true);
        assert_eq!(regs.shadow(16), Some(Shadow { value: 0x40, dirty: true }));
    }

    #[test]
    fn test_preset_value_is_written_once_even_if_unchanged() {
        let (mut regs, mut bus, log) = setup(Access::WriteOnly);
        regs.preset(14, 0xF9);
        regs.write(&mut bus, &log, 14, 0xF9).unwrap();
        assert_eq!(bus.writes_to(ADDR), vec![(14, 0xF9)]);
    }

    #[test]
    fn test_reset_forgets_shadow() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.write(&mut bus, &log, 16, 1).unwrap();
        regs.reset(&log);
        assert_eq!(regs.state(), DeviceState::Uninitialised);
        assert_eq!(regs.shadow(16), None);
    }

    #[test]
    fn test_log_lines_identify_device() {
        let (mut regs, mut bus, log) = setup(Access::ReadBack);
        regs.set_chip(ChipType::Es9028Pro);
        regs.write(&mut bus, &log, 16, 1).unwrap();
        assert!(log.contains("test [ES9028PRO @0x48] writing 0b00000001 to register 16"));
    }
}
