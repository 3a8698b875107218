//! Hardware seams for the Sabre DAC control stack
//!
//! Everything the chip drivers and the controller need from the board lives
//! behind a small trait here, so the same driver code runs on a
//! microcontroller and in host tests.
//!
//! # Architecture Layers
//!
//! ```text
//! dac-control (Controller, VolumeControl)
//!         ↓
//! sabre (ES9018 / ES9028 drivers, register file)
//!         ↓
//! platform (this crate - bus, pins, clock, log sink)
//!         ↓
//! embedded-hal 1.0 implementation (board HAL)
//! ```
//!
//! # Seams
//!
//! - [`RegisterBus`] - single-register I²C access; [`I2cTransport`] adapts any
//!   `embedded_hal::i2c::I2c`
//! - [`OutputLine`] - optional active-high output (power relay, DAC reset)
//! - [`AnalogInput`] - potentiometer wiper
//! - [`Clock`] - monotonic time for cooperative polling
//! - [`LogSink`] - levelled diagnostics
//!
//! # Features
//!
//! - `std`: host mocks in [`mocks`]
//! - `defmt`: `defmt::Format` derives and [`log::DefmtSink`]
//! - `tracing`: [`log::TracingSink`]

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
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors - callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod audio_types;
pub mod clock;
pub mod gpio;
pub mod log;
pub mod mocks;
pub mod transport;

pub use audio_types::{Attenuation, I2cAddress, OutOfRangeError};
pub use clock::{Clock, SystemClock};
pub use gpio::{AnalogInput, NoPin, OutputLine, ANALOG_FULL_SCALE};
pub use log::{Level, LogSink, NullSink};
pub use transport::{BusError, I2cTransport, ReadTimeout, RegisterBus};
