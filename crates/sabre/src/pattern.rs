//! Eight-symbol bit patterns for partial register updates.
//!
//! A pattern names every bit of a register, most-significant first:
//! `'1'` sets the bit, `'0'` clears it and `'*'` leaves it alone. So
//! `"*****1**"` sets bit 2 and `"******00"` clears bits 1 and 0.

use core::fmt;

use thiserror_no_std::Error;

/// Reason a pattern string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatternError {
    /// Not exactly eight symbols
    #[error("pattern has {len} symbols, expected 8")]
    Length {
        /// Number of symbols found
        len: usize,
    },
    /// A symbol other than `0`, `1` or `*`
    #[error("invalid symbol '{symbol}' at position {position}")]
    Symbol {
        /// Offending symbol
        symbol: char,
        /// Zero-based position from the left
        position: usize,
    },
}

/// Parsed pattern: `mask` selects the bits to touch, `value` holds their
/// new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitPattern {
    mask: u8,
    value: u8,
}

impl BitPattern {
    /// Number of symbols in a pattern.
    pub const LEN: usize = 8;

    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let len = pattern.chars().count();
        if len != Self::LEN {
            return Err(PatternError::Length { len });
        }

        let mut mask = 0u8;
        let mut value = 0u8;
        let mut bit = 0x80u8;
        for (position, symbol) in pattern.chars().enumerate() {
            match symbol {
                '0' => mask |= bit,
                '1' => {
                    mask |= bit;
                    value |= bit;
                }
                '*' => {}
                symbol => return Err(PatternError::Symbol { symbol, position }),
            }
            bit = bit.wrapping_shr(1);
        }
        Ok(Self { mask, value })
    }

    /// Bits this pattern touches.
    pub const fn mask(self) -> u8 {
        self.mask
    }

    /// New state of the touched bits.
    pub const fn value(self) -> u8 {
        self.value
    }

    /// True for an all-`*` pattern.
    pub const fn is_noop(self) -> bool {
        self.mask == 0
    }

    /// Overlay the pattern on `current`.
    pub const fn apply(self, current: u8) -> u8 {
        (current & !self.mask) | self.value
    }
}

impl fmt::Display for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bit = 0x80u8;
        while bit != 0 {
            let symbol = if self.mask & bit == 0 {
                '*'
            } else if self.value & bit == 0 {
                '0'
            } else {
                '1'
            };
            fmt::Write::write_char(f, symbol)?;
            bit = bit.wrapping_shr(1);
        }
        Ok(())
    }
}
