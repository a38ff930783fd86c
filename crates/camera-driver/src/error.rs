//! Native Driver Result Codes

use thiserror::Error;

/// Non-success result codes a driver may report
///
/// This is the single native result code space of the driver interface.
/// Drivers that speak raw integer codes convert with [`DriverStatus::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverStatus {
    /// Driver is busy with another operation
    #[error("Driver busy")]
    Busy,

    /// Driver refused the request in its current state
    #[error("Request denied by driver")]
    Denied,

    /// Operation failed inside the driver
    #[error("Driver operation failed")]
    Failed,

    /// A previous request of the same kind is still running
    #[error("Operation already in progress")]
    InProgress,

    /// Driver gave up waiting on the hardware
    #[error("Driver timed out")]
    Timeout,

    /// Capability not implemented by this driver
    #[error("Capability not supported by driver")]
    Unsupported,

    /// No device or driver module behind the handle
    #[error("Driver not available")]
    NotAvailable,

    /// Code outside the documented range
    #[error("Unknown driver result code {0}")]
    Unknown(i32),
}

impl DriverStatus {
    /// Decode a raw driver result code. `0` is success.
    pub fn from_code(code: i32) -> Result<(), DriverStatus> {
        match code {
            0 => Ok(()),
            1 => Err(DriverStatus::Busy),
            2 => Err(DriverStatus::Denied),
            3 => Err(DriverStatus::Failed),
            4 => Err(DriverStatus::InProgress),
            5 => Err(DriverStatus::Timeout),
            6 => Err(DriverStatus::Unsupported),
            7 => Err(DriverStatus::NotAvailable),
            other => Err(DriverStatus::Unknown(other)),
        }
    }

    /// Raw code for this status
    pub fn code(&self) -> i32 {
        match self {
            DriverStatus::Busy => 1,
            DriverStatus::Denied => 2,
            DriverStatus::Failed => 3,
            DriverStatus::InProgress => 4,
            DriverStatus::Timeout => 5,
            DriverStatus::Unsupported => 6,
            DriverStatus::NotAvailable => 7,
            DriverStatus::Unknown(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_success() {
        assert_eq!(DriverStatus::from_code(0), Ok(()));
    }

    #[test]
    fn test_known_codes() {
        for status in [
            DriverStatus::Busy,
            DriverStatus::Denied,
            DriverStatus::Failed,
            DriverStatus::InProgress,
            DriverStatus::Timeout,
            DriverStatus::Unsupported,
            DriverStatus::NotAvailable,
        ] {
            assert_eq!(DriverStatus::from_code(status.code()), Err(status));
        }
    }

    #[test]
    fn test_unknown_code_preserved() {
        assert_eq!(DriverStatus::from_code(42), Err(DriverStatus::Unknown(42)));
        assert_eq!(DriverStatus::from_code(-1), Err(DriverStatus::Unknown(-1)));
    }
}
