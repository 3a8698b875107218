//! Audio hardware newtypes.
//!
//! - `I2cAddress`: 7-bit device address with the reserved ranges rejected
//! - `Attenuation`: DAC attenuation step, clamped to a device maximum

use thiserror_no_std::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── I2cAddress ───────────────────────────────────────────────────────────────

/// 7-bit I²C device address.
///
/// ## Reserved I2C addresses (I2C specification):
/// - 0x00–0x07: reserved (general call, CBUS, etc.)
/// - 0x78–0x7F: reserved (10-bit address prefix, device ID, etc.)
///
/// ```rust
/// use platform::audio_types::I2cAddress;
///
/// let dac = I2cAddress::try_new(0x48).unwrap();
/// assert_eq!(dac.get(), 0x48);
/// assert!(I2cAddress::try_new(0x78).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// Lowest non-reserved address.
    pub const MIN: u8 = 0x08;
    /// Highest non-reserved address.
    pub const MAX: u8 = 0x77;

    /// Create an address without checking reserved ranges.
    ///
    /// Only for hardware-fixed constants; the value is masked to 7 bits.
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Create an address, rejecting I²C-reserved ranges.
    pub fn try_new(addr: u8) -> Result<Self, OutOfRangeError> {
        if (Self::MIN..=Self::MAX).contains(&addr) {
            Ok(Self(addr))
        } else {
            Err(OutOfRangeError {
                value: u32::from(addr),
                min: u32::from(Self::MIN),
                max: u32::from(Self::MAX),
            })
        }
    }

    /// Return the 7-bit address.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for I2cAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

// ── Attenuation ──────────────────────────────────────────────────────────────

/// DAC attenuation in chip steps (0 = full level; higher = quieter).
///
/// Sabre chips use 0.5 dB steps, so the raw value is twice the attenuation in
/// decibels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Attenuation(u8);

impl Attenuation {
    /// No attenuation.
    pub const ZERO: Self = Self(0);

    /// Raw step value.
    #[must_use]
    pub const fn new(steps: u8) -> Self {
        Self(steps)
    }

    /// Clamp `steps` to `max`, the largest value the device can represent.
    #[must_use]
    pub fn clamped(steps: u8, max: u8) -> Self {
        Self(steps.min(max))
    }

    /// Return the raw step value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Attenuation in tenths of a decibel (0.5 dB per step).
    #[must_use]
    pub fn decibels_x10(self) -> u16 {
        u16::from(self.0).saturating_mul(5)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_new_masks_to_seven_bits() {
        assert_eq!(I2cAddress::new(0xC8).get(), 0x48);
    }

    #[test]
    fn test_out_of_range_error_renders_bounds() {
        let err = I2cAddress::try_new(0x03).unwrap_err();
        assert_eq!(format!("{err}"), "value 3 outside 8..=119");
    }

    #[test]
    fn test_address_display_is_hex() {
        assert_eq!(format!("{}", I2cAddress::new(0x48)), "0x48");
    }

    #[test]
    fn test_attenuation_decibels() {
        assert_eq!(Attenuation::new(124).decibels_x10(), 620);
        assert_eq!(Attenuation::ZERO.decibels_x10(), 0);
    }
}
