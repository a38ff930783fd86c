//! Bridge Error Types and Protocol Result Codes

use camera_driver::DriverStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by bridge operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    /// A conflicting session or timer is active
    #[error("Camera busy: {0}")]
    Busy(&'static str),

    /// Malformed identifier, out-of-range value, unknown storage or camera id
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Driver lacks the capability, or the setting is unknown / not applicable
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Bounded wait on the driver expired
    #[error("Timeout waiting for driver")]
    Timeout,

    /// Driver reported a failure not otherwise classified
    #[error("Driver error: {0}")]
    Driver(DriverStatus),

    /// No driver handle held
    #[error("Camera not connected")]
    NotConnected,

    /// No compatible driver behind the injected handle
    #[error("Camera driver unavailable")]
    DriverUnavailable,

    /// Driver reported failure during `prepare`
    #[error("Camera initialization failed: {0}")]
    InitializationFailed(DriverStatus),

    /// Storage index could not be enumerated
    #[error("Camera storage unavailable: {0}")]
    StorageUnavailable(DriverStatus),
}

impl From<DriverStatus> for CameraError {
    fn from(status: DriverStatus) -> Self {
        match status {
            DriverStatus::Busy | DriverStatus::InProgress => CameraError::Busy("driver busy"),
            DriverStatus::Timeout => CameraError::Timeout,
            DriverStatus::Unsupported => {
                CameraError::Unsupported("capability not supported by driver".to_string())
            }
            DriverStatus::NotAvailable => CameraError::NotConnected,
            DriverStatus::Denied | DriverStatus::Failed | DriverStatus::Unknown(_) => {
                CameraError::Driver(status)
            }
        }
    }
}

/// Protocol-level result of a bridge operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraResult {
    Success,
    Busy,
    InvalidArgument,
    Unsupported,
    Timeout,
    DriverError,
    NotConnected,
}

impl CameraError {
    /// Protocol result code for this error
    pub fn result(&self) -> CameraResult {
        match self {
            CameraError::Busy(_) => CameraResult::Busy,
            CameraError::InvalidArgument(_) => CameraResult::InvalidArgument,
            CameraError::Unsupported(_) => CameraResult::Unsupported,
            CameraError::Timeout => CameraResult::Timeout,
            CameraError::NotConnected | CameraError::DriverUnavailable => {
                CameraResult::NotConnected
            }
            CameraError::Driver(_)
            | CameraError::InitializationFailed(_)
            | CameraError::StorageUnavailable(_) => CameraResult::DriverError,
        }
    }
}

impl<T> From<&Result<T, CameraError>> for CameraResult {
    fn from(result: &Result<T, CameraError>) -> Self {
        match result {
            Ok(_) => CameraResult::Success,
            Err(e) => e.result(),
        }
    }
}

impl fmt::Display for CameraResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CameraResult::Success => "Success",
            CameraResult::Busy => "Busy",
            CameraResult::InvalidArgument => "Invalid Argument",
            CameraResult::Unsupported => "Unsupported",
            CameraResult::Timeout => "Timeout",
            CameraResult::DriverError => "Driver Error",
            CameraResult::NotConnected => "Not Connected",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_status_mapping() {
        assert_eq!(
            CameraError::from(DriverStatus::Busy).result(),
            CameraResult::Busy
        );
        assert_eq!(
            CameraError::from(DriverStatus::InProgress).result(),
            CameraResult::Busy
        );
        assert_eq!(
            CameraError::from(DriverStatus::Unsupported).result(),
            CameraResult::Unsupported
        );
        assert_eq!(
            CameraError::from(DriverStatus::Timeout).result(),
            CameraResult::Timeout
        );
        assert_eq!(
            CameraError::from(DriverStatus::NotAvailable).result(),
            CameraResult::NotConnected
        );
        assert_eq!(
            CameraError::from(DriverStatus::Failed).result(),
            CameraResult::DriverError
        );
    }

    #[test]
    fn test_unknown_codes_are_driver_errors() {
        let status = DriverStatus::from_code(99).unwrap_err();
        assert_eq!(CameraError::from(status).result(), CameraResult::DriverError);
    }

    #[test]
    fn test_result_from_ok() {
        let ok: Result<(), CameraError> = Ok(());
        assert_eq!(CameraResult::from(&ok), CameraResult::Success);
        let err: Result<(), CameraError> = Err(CameraError::NotConnected);
        assert_eq!(CameraResult::from(&err), CameraResult::NotConnected);
    }
}
