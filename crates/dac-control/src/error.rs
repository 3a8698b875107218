//! Controller-level failures.

use thiserror_no_std::Error;

use crate::event::DeviceMask;

/// Failure of a controller operation that fans out to every device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Devices are not initialised, or some failed to initialise
    #[error("devices not ready")]
    NotReady,
    /// Power is off
    #[error("power is off")]
    NotPowered,
    /// The operation failed on the listed devices; the others completed
    #[error("failed on devices {0}")]
    Devices(DeviceMask),
}

impl ControlError {
    /// Devices that failed, empty for the state errors.
    pub fn failed(&self) -> DeviceMask {
        match *self {
            Self::Devices(mask) => mask,
            Self::NotReady | Self::NotPowered => DeviceMask::EMPTY,
        }
    }
}

/// `Ok` when `failed` is empty.
pub(crate) fn check(failed: DeviceMask) -> Result<(), ControlError> {
    if failed.is_empty() {
        Ok(())
    } else {
        Err(ControlError::Devices(failed))
    }
}
