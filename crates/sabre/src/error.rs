//! Driver error taxonomy.

use platform::BusError;
use thiserror_no_std::Error;

use crate::pattern::PatternError;

/// Failure of a DAC register or device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacError {
    /// Register access before `initialise()` (or after a reset)
    #[error("register {register}: device not initialised")]
    NotInitialised {
        /// Register that was addressed
        register: u8,
    },
    /// The bus transaction failed (NACK, overrun, read timeout, ...)
    #[error("register {register}: {source}")]
    Bus {
        /// Register that was addressed
        register: u8,
        /// Transport failure
        source: BusError,
    },
    /// The value read back after a write differs from the value written
    #[error("register {register}: wrote {wrote:#04X}, read back {read:#04X}")]
    Verify {
        /// Register that was written
        register: u8,
        /// Value sent
        wrote: u8,
        /// Value read back
        read: u8,
    },
    /// Malformed bit pattern; nothing was sent
    #[error("register {register}: {source}")]
    InvalidPattern {
        /// Register the pattern was meant for
        register: u8,
        /// Parse failure
        source: PatternError,
    },
    /// Bit patch on a write-only register whose content was never recorded
    #[error("register {register}: content unknown")]
    UnknownContent {
        /// Register that was addressed
        register: u8,
    },
    /// The identification register holds an unrecognised chip ID
    #[error("unknown chip id {id:#04X}")]
    UnknownChip {
        /// Raw identification value
        id: u8,
    },
    /// The requested setting is not supported by this chip
    #[error("invalid setting")]
    InvalidSetting,
}

impl DacError {
    /// Register involved, when the failure is tied to one.
    pub fn register(&self) -> Option<u8> {
        match *self {
            Self::NotInitialised { register }
            | Self::Bus { register, .. }
            | Self::Verify { register, .. }
            | Self::InvalidPattern { register, .. }
            | Self::UnknownContent { register } => Some(register),
            Self::UnknownChip { .. } | Self::InvalidSetting => None,
        }
    }

    /// True for a read that ran out of retries.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Bus {
                source: BusError::Timeout,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_reported_where_known() {
        let err = DacError::Verify {
            register: 7,
            wrote: 1,
            read: 0,
        };
        assert_eq!(err.register(), Some(7));
        assert_eq!(DacError::UnknownChip { id: 3 }.register(), None);
    }

    #[test]
    fn test_timeout_is_distinguished() {
        let timeout = DacError::Bus {
            register: 64,
            source: BusError::Timeout,
        };
        let nack = DacError::Bus {
            register: 64,
            source: BusError::AddressNack,
        };
        assert!(timeout.is_timeout());
        assert!(!nack.is_timeout());
    }

    #[test]
    fn test_messages_carry_register() {
        let err = DacError::Verify {
            register: 16,
            wrote: 0x7C,
            read: 0x00,
        };
        assert_eq!(format!("{err}"), "register 16: wrote 0x7C, read back 0x00");
    }
}
