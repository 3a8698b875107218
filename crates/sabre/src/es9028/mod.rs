//! ES9028PRO / ES9038PRO DAC driver module (ESS Technology)
//!
//! | ADDR pin | Address |
//! |----------|---------|
//! | GND      | `0x48`  |
//! | VDD      | `0x49`  |

pub mod registers;

mod driver;

pub(crate) use driver::dpll_to_hz;
pub use driver::{Es9028, SignalStatus, SignalType};
