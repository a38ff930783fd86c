//! Camera Driver Interface
//!
//! The surface a camera bridge consumes to reach a vendor driver:
//! - Capture control (photo, video, streaming)
//! - Mode control and native parameter get/set
//! - Storage enumeration and formatting
//! - Asynchronous driver events (storage refresh, capture completion, disconnect)
//!
//! Drivers implement [`CameraDriver`]. Optional capabilities have default
//! implementations that report [`DriverStatus::Unsupported`].

mod driver;
mod error;
mod parameter;
pub mod sim;
mod types;

pub use driver::{CameraDriver, DriverEvent, EventSink};
pub use error::DriverStatus;
pub use parameter::{NativeKind, NativeValue, Parameter};
pub use sim::SimulatedDriver;
pub use types::{
    CameraInformation, DriverMode, NativeCapture, StorageInformation, StorageStatus, StorageType,
    StreamDescriptor, StreamSpectrum,
};

/// Result of a native driver call
pub type DriverResult<T> = Result<T, DriverStatus>;
