//! Mock implementations for testing
//!
//! Host-side stand-ins for everything the drivers touch: a register-level bus
//! simulator with fault injection, output pins, an analog input, a manual
//! clock and a log sink that records lines.
//!
//! Pins and the analog input share their state between clones, so a test can
//! hand one clone to the code under test and keep another to observe or poke
//! it.

#![cfg(any(test, feature = "std"))]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use core::convert::Infallible;
use core::fmt;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::clock::Clock;
use crate::gpio::AnalogInput;
use crate::log::{Level, LogSink};
use crate::transport::{BusError, RegisterBus};

// ── SimBus ───────────────────────────────────────────────────────────────────

/// One transaction seen by [`SimBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// Register read
    Read {
        /// Device address
        address: u8,
        /// Register
        register: u8,
    },
    /// Register write
    Write {
        /// Device address
        address: u8,
        /// Register
        register: u8,
        /// Value sent
        value: u8,
    },
}

#[derive(Debug, Default)]
struct SimDevice {
    registers: BTreeMap<u8, u8>,
    read_faults: BTreeMap<u8, BusError>,
    write_fault: Option<BusError>,
    ignored: BTreeSet<u8>,
    present: bool,
}

/// Register-level simulation of the devices on a bus.
///
/// Unregistered (or absent) addresses NACK the address phase. Registers read
/// as zero until written. Faults are injected per device or per register and
/// stay in place until cleared.
#[derive(Debug, Default)]
pub struct SimBus {
    devices: BTreeMap<u8, SimDevice>,
    ops: Vec<BusOp>,
}

impl SimBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device at `address`.
    pub fn add_device(&mut self, address: u8) -> &mut Self {
        self.devices.insert(
            address,
            SimDevice {
                present: true,
                ..SimDevice::default()
            },
        );
        self
    }

    /// Make a device answer (or stop answering) without losing its registers.
    pub fn set_present(&mut self, address: u8, present: bool) {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.present = present;
        }
    }

    /// Set chip-side register content, e.g. an ID or status register.
    pub fn set_register(&mut self, address: u8, register: u8, value: u8) {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.registers.insert(register, value);
        }
    }

    /// Chip-side register content.
    pub fn register(&self, address: u8, register: u8) -> u8 {
        self.devices
            .get(&address)
            .and_then(|dev| dev.registers.get(&register).copied())
            .unwrap_or(0)
    }

    /// Set or clear individual bits of a chip-side register.
    pub fn set_bit(&mut self, address: u8, register: u8, bit: u8, on: bool) {
        let mask = 1u8.wrapping_shl(u32::from(bit & 7));
        let value = self.register(address, register);
        let value = if on { value | mask } else { value & !mask };
        self.set_register(address, register, value);
    }

    /// Fail every read of `register` with `error`.
    pub fn fail_reads(&mut self, address: u8, register: u8, error: BusError) {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.read_faults.insert(register, error);
        }
    }

    /// Fail every write to the device with `error`.
    pub fn fail_writes(&mut self, address: u8, error: BusError) {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.write_fault = Some(error);
        }
    }

    /// Acknowledge writes to `register` but leave its content unchanged.
    pub fn ignore_writes(&mut self, address: u8, register: u8) {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.ignored.insert(register);
        }
    }

    /// Remove every injected fault on the device.
    pub fn clear_faults(&mut self, address: u8) {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.read_faults.clear();
            dev.write_fault = None;
            dev.ignored.clear();
            dev.present = true;
        }
    }

    /// Every transaction attempted so far, in order.
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Writes attempted to the device, as `(register, value)`.
    pub fn writes_to(&self, address: u8) -> Vec<(u8, u8)> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                BusOp::Write {
                    address: a,
                    register,
                    value,
                } if a == address => Some((register, value)),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded transactions.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    fn device(&mut self, address: u8) -> Result<&mut SimDevice, BusError> {
        match self.devices.get_mut(&address) {
            Some(dev) if dev.present => Ok(dev),
            _ => Err(BusError::AddressNack),
        }
    }
}

impl RegisterBus for SimBus {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        self.ops.push(BusOp::Read { address, register });
        let dev = self.device(address)?;
        if let Some(err) = dev.read_faults.get(&register) {
            return Err(*err);
        }
        Ok(dev.registers.get(&register).copied().unwrap_or(0))
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.ops.push(BusOp::Write {
            address,
            register,
            value,
        });
        let dev = self.device(address)?;
        if let Some(err) = dev.write_fault {
            return Err(err);
        }
        if !dev.ignored.contains(&register) {
            dev.registers.insert(register, value);
        }
        Ok(())
    }
}

// ── MockPin ──────────────────────────────────────────────────────────────────

/// Output pin whose level is shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    high: Rc<Cell<bool>>,
    transitions: Rc<Cell<u32>>,
}

impl MockPin {
    /// Pin starting low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level.
    pub fn is_high(&self) -> bool {
        self.high.get()
    }

    /// Number of `set_high` / `set_low` calls.
    pub fn transitions(&self) -> u32 {
        self.transitions.get()
    }

    fn drive(&self, high: bool) {
        self.high.set(high);
        self.transitions.set(self.transitions.get().saturating_add(1));
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

// ── MockAnalog ───────────────────────────────────────────────────────────────

/// Analog input returning a settable value, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MockAnalog {
    value: Rc<Cell<u16>>,
    reads: Rc<Cell<u32>>,
}

impl MockAnalog {
    /// Input reading `value`.
    pub fn new(value: u16) -> Self {
        let analog = Self::default();
        analog.set(value);
        analog
    }

    /// Change the value returned by subsequent reads.
    pub fn set(&self, value: u16) {
        self.value.set(value);
    }

    /// Number of conversions taken.
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }
}

impl AnalogInput for MockAnalog {
    type Error = Infallible;

    fn read(&mut self) -> Result<u16, Self::Error> {
        self.reads.set(self.reads.get().saturating_add(1));
        Ok(self.value.get())
    }
}

// ── ManualClock ──────────────────────────────────────────────────────────────

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock at `ms` milliseconds.
    pub fn at_ms(ms: u64) -> Self {
        Self {
            now_ms: Cell::new(ms),
        }
    }

    /// Move forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(ms));
    }

    /// Move forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.advance_ms(duration.as_millis());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms.get())
    }
}

// ── RecordingSink ────────────────────────────────────────────────────────────

/// Log sink that keeps every line for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: RefCell<Vec<(Level, String)>>,
}

impl RecordingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded line.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|(_, line)| line.contains(needle))
    }

    /// Number of lines at `level`.
    pub fn count(&self, level: Level) -> usize {
        self.lines.borrow().iter().filter(|(l, _)| *l == level).count()
    }

    /// Drop recorded lines.
    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.lines.borrow_mut().push((level, std::format!("{args}")));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_sim_bus_absent_device_nacks() {
        let mut bus = SimBus::new();
        assert_eq!(bus.read_register(0x48, 0), Err(BusError::AddressNack));
        bus.add_device(0x48);
        bus.set_present(0x48, false);
        assert_eq!(bus.write_register(0x48, 0, 1), Err(BusError::AddressNack));
    }

    #[test]
    fn test_sim_bus_stores_writes() {
        let mut bus = SimBus::new();
        bus.add_device(0x48);
        bus.write_register(0x48, 16, 0x40).unwrap();
        assert_eq!(bus.read_register(0x48, 16).unwrap(), 0x40);
        assert_eq!(bus.writes_to(0x48), vec![(16, 0x40)]);
        assert_eq!(bus.ops().len(), 2);
    }

    #[test]
    fn test_sim_bus_faults() {
        let mut bus = SimBus::new();
        bus.add_device(0x48);
        bus.fail_reads(0x48, 64, BusError::Timeout);
        bus.ignore_writes(0x48, 7);
        assert_eq!(bus.read_register(0x48, 64), Err(BusError::Timeout));
        bus.write_register(0x48, 7, 1).unwrap();
        assert_eq!(bus.register(0x48, 7), 0);

        bus.fail_writes(0x48, BusError::DataNack);
        assert_eq!(bus.write_register(0x48, 1, 1), Err(BusError::DataNack));

        bus.clear_faults(0x48);
        assert!(bus.read_register(0x48, 64).is_ok());
    }

    #[test]
    fn test_sim_bus_set_bit() {
        let mut bus = SimBus::new();
        bus.add_device(0x49);
        bus.set_bit(0x49, 64, 0, true);
        bus.set_bit(0x49, 64, 1, true);
        bus.set_bit(0x49, 64, 0, false);
        assert_eq!(bus.register(0x49, 64), 0b10);
    }

    #[test]
    fn test_mock_pin_clones_share_state() {
        let pin = MockPin::new();
        let mut driven = pin.clone();
        driven.set_high().unwrap();
        assert!(pin.is_high());
        assert_eq!(pin.transitions(), 1);
    }

    #[test]
    fn test_mock_analog_counts_reads() {
        let analog = MockAnalog::new(512);
        let mut input = analog.clone();
        assert_eq!(input.read().unwrap(), 512);
        analog.set(100);
        assert_eq!(input.read().unwrap(), 100);
        assert_eq!(analog.reads(), 2);
    }

    #[test]
    fn test_recording_sink_counts_levels() {
        let sink = RecordingSink::new();
        sink.error(format_args!("boom"));
        sink.info(format_args!("ok"));
        assert_eq!(sink.count(Level::Error), 1);
        sink.clear();
        assert!(sink.lines().is_empty());
    }
}
