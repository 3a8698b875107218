//! DAC power, status and volume control
//!
//! [`Controller`] owns a fixed array of Sabre DACs on one register bus and
//! runs them from a cooperative loop:
//!
//! ```ignore
//! let mut ctrl = Controller::new(bus, log, SystemClock, [left, right], ControllerConfig::default())
//!     .with_power_relay(relay_pin)
//!     .with_dac_reset(reset_pin);
//! ctrl.on(EventKind::Lock, |_| { /* light the lock LED */ });
//! ctrl.power_on();
//! loop {
//!     ctrl.poll();
//!     volume.poll(&mut ctrl);
//! }
//! ```
//!
//! Events are delivered inline to one optional handler per [`EventKind`].
//! [`VolumeControl`] reads a potentiometer and forwards attenuation through
//! the [`AttenuationTarget`] trait, which the controller implements.

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
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod volume;

pub use config::ControllerConfig;
pub use controller::{Controller, ControllerState, DeviceSetup};
pub use error::ControlError;
pub use event::{DeviceMask, Event, EventKind, Handler, Handlers, LockMask, LockStatus, MAX_DEVICES};
pub use volume::{AttenuationTarget, MotorDirection, VolumeConfig, VolumeControl};
