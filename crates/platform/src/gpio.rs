//! Digital output lines and analog inputs
//!
//! Board wiring is optional: a controller may run without a power relay or a
//! DAC reset line. [`OutputLine`] wraps an `embedded-hal` output pin that may
//! be absent, so callers drive the line unconditionally and an unwired line is
//! a no-op instead of a magic pin number.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

// ── Output lines ─────────────────────────────────────────────────────────────

/// Active-high output that may not be wired.
#[derive(Debug)]
pub struct OutputLine<P> {
    pin: Option<P>,
    active: bool,
}

impl<P: OutputPin> OutputLine<P> {
    /// Line driven through `pin`.
    pub fn new(pin: P) -> Self {
        Self {
            pin: Some(pin),
            active: false,
        }
    }

    /// Line with no pin behind it.
    pub fn absent() -> Self {
        Self {
            pin: None,
            active: false,
        }
    }

    /// Whether a pin is wired.
    pub fn is_present(&self) -> bool {
        self.pin.is_some()
    }

    /// Last level requested through [`set_active`](Self::set_active).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Drive the line high (`true`) or low (`false`).
    ///
    /// The requested level is remembered even when no pin is wired or the pin
    /// reports an error.
    pub fn set_active(&mut self, active: bool) -> Result<(), P::Error> {
        self.active = active;
        match self.pin.as_mut() {
            Some(pin) if active => pin.set_high(),
            Some(pin) => pin.set_low(),
            None => Ok(()),
        }
    }

    /// Give back the pin, if any.
    pub fn release(self) -> Option<P> {
        self.pin
    }
}

/// Placeholder pin type for lines that are never wired.
///
/// `OutputLine::<NoPin>::absent()` names a concrete type without dragging a
/// HAL pin into the signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ── Analog input ─────────────────────────────────────────────────────────────

/// Single-channel analog reading (e.g. a potentiometer wiper on an ADC pin).
pub trait AnalogInput {
    /// Error type
    type Error;

    /// Take one conversion. Full scale is 10 bits (`0..=1023`).
    fn read(&mut self) -> Result<u16, Self::Error>;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    type Error = T::Error;

    fn read(&mut self) -> Result<u16, Self::Error> {
        (**self).read()
    }
}

/// Full-scale value of an [`AnalogInput`] reading.
pub const ANALOG_FULL_SCALE: u16 = 1023;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::MockPin;

    #[test]
    fn test_line_drives_pin_and_remembers_level() {
        let pin = MockPin::new();
        let mut line = OutputLine::new(pin.clone());
        assert!(!line.is_active());

        line.set_active(true).unwrap();
        assert!(line.is_active());
        assert!(pin.is_high());

        line.set_active(false).unwrap();
        assert!(!pin.is_high());
        assert_eq!(pin.transitions(), 2);
    }

    #[test]
    fn test_absent_line_is_noop() {
        let mut line = OutputLine::<NoPin>::absent();
        assert!(!line.is_present());
        line.set_active(true).unwrap();
        assert!(line.is_active());
        assert!(line.release().is_none());
    }
}
