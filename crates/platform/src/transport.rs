//! Single-register access over a two-wire bus
//!
//! Sabre DACs expose 8-bit registers behind a 7-bit I²C address. A register
//! read is two transactions: an address phase (write the register pointer)
//! followed by a one-byte data phase. The chips do not support sequential
//! multi-byte reads, so every register is read on its own.
//!
//! The data phase is retried a bounded number of times with a fixed busy-wait
//! between attempts. Running out of attempts is reported as
//! [`BusError::Timeout`], distinct from a NACK on the address phase, so the
//! two show up differently in the logs.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use thiserror_no_std::Error;

/// Failure of a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Data too long for the controller's transmit buffer
    #[error("data too long to fit in transmit buffer")]
    Overrun,
    /// No ACK while sending the device address
    #[error("received NACK on transmit of address")]
    AddressNack,
    /// No ACK while sending data
    #[error("received NACK on transmit of data")]
    DataNack,
    /// The device acknowledged but never produced the requested byte
    #[error("timed out waiting for data")]
    Timeout,
    /// Arbitration loss, bus fault or anything the HAL could not classify
    #[error("unspecified bus error")]
    Other,
}

impl From<ErrorKind> for BusError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Overrun => Self::Overrun,
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => Self::AddressNack,
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => Self::DataNack,
            _ => Self::Other,
        }
    }
}

/// Register-level access to devices on a shared bus.
///
/// This is the seam between chip drivers and the bus. [`I2cTransport`] is the
/// hardware implementation; host tests use `mocks::SimBus`.
pub trait RegisterBus {
    /// Read one register of the device at `address`.
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError>;

    /// Write one register of the device at `address`.
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        (**self).read_register(address, register)
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write_register(address, register, value)
    }
}

/// Bound on the data phase of a register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadTimeout {
    /// Busy-wait between data-phase attempts, in microseconds
    pub poll_interval_us: u32,
    /// Number of data-phase attempts before giving up (at least one is made)
    pub retries: u8,
}

impl ReadTimeout {
    /// Worst-case time spent waiting in one read, in microseconds.
    pub const fn budget_us(&self) -> u32 {
        self.poll_interval_us.saturating_mul(self.retries as u32)
    }
}

impl Default for ReadTimeout {
    fn default() -> Self {
        Self {
            poll_interval_us: 200,
            retries: 5,
        }
    }
}

/// [`RegisterBus`] over an `embedded-hal` 1.0 I²C bus.
///
/// Owns the bus and a delay provider for the read retry loop. All devices on
/// the bus go through one transport, issued serially from the polling loop.
pub struct I2cTransport<I, D> {
    i2c: I,
    delay: D,
    timeout: ReadTimeout,
}

impl<I: I2c, D: DelayNs> I2cTransport<I, D> {
    /// Create a transport with the default [`ReadTimeout`].
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_timeout(i2c, delay, ReadTimeout::default())
    }

    /// Create a transport with an explicit read bound.
    pub fn with_timeout(i2c: I, delay: D, timeout: ReadTimeout) -> Self {
        Self {
            i2c,
            delay,
            timeout,
        }
    }

    /// Active read bound.
    pub fn timeout(&self) -> ReadTimeout {
        self.timeout
    }

    /// Give back the bus and the delay provider.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

impl<I: I2c, D: DelayNs> RegisterBus for I2cTransport<I, D> {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        self.i2c
            .write(address, &[register])
            .map_err(|e| BusError::from(e.kind()))?;

        let mut buf = [0u8; 1];
        for _ in 0..self.timeout.retries.max(1) {
            if self.i2c.read(address, &mut buf).is_ok() {
                let [value] = buf;
                return Ok(value);
            }
            self.delay.delay_us(self.timeout.poll_interval_us);
        }
        Err(BusError::Timeout)
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(address, &[register, value])
            .map_err(|e| BusError::from(e.kind()))
    }
}
