//! ES9018 DAC driver module (ESS Technology)
//!
//! | ADDR pin | Address |
//! |----------|---------|
//! | GND      | `0x48`  |
//! | VDD      | `0x49`  |

pub mod registers;

mod driver;

pub use driver::Es9018;
