//! Driver trait and event plumbing

use crate::error::DriverStatus;
use crate::parameter::{NativeKind, NativeValue, Parameter};
use crate::types::{
    CameraInformation, DriverMode, NativeCapture, StorageInformation, StreamDescriptor,
};
use crate::DriverResult;
use std::sync::Arc;

/// Asynchronous events raised by a driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// Storage capacity or state changed
    StorageUpdated(StorageInformation),
    /// A requested capture finished
    CaptureCompleted(NativeCapture),
    /// The device went away; the handle is no longer usable
    Disconnected,
}

/// Callback receiving driver events. May be invoked from any driver thread.
pub type EventSink = Arc<dyn Fn(DriverEvent) + Send + Sync>;

/// Camera driver
///
/// # Contract
/// - Every call blocks until the driver acknowledges the request, not until
///   follow-on events (such as a capture completion) arrive
/// - Follow-on events are delivered through the [`EventSink`] registered with
///   [`CameraDriver::subscribe_events`]
/// - Capabilities a driver lacks report [`DriverStatus::Unsupported`]
///
/// # Thread Safety
/// Methods take `&self` and may be called from several threads at once.
pub trait CameraDriver: Send + Sync {
    /// Open the device and perform driver initialisation
    fn open(&self) -> DriverResult<()>;

    /// Release the device
    fn close(&self);

    /// Request a single capture; completion arrives as [`DriverEvent::CaptureCompleted`]
    fn take_photo(&self) -> DriverResult<()>;

    /// Current operating mode
    fn mode(&self) -> DriverResult<DriverMode>;

    /// Switch operating mode
    fn set_mode(&self, mode: DriverMode) -> DriverResult<()>;

    /// Read a native parameter
    fn get_parameter(&self, parameter: &Parameter) -> DriverResult<NativeValue>;

    /// Write a native parameter
    fn set_parameter(&self, parameter: &Parameter, value: NativeValue) -> DriverResult<()>;

    /// Native encoding the driver uses for `parameter`, if it advertises one.
    /// Must not block.
    fn parameter_kind(&self, _parameter: &Parameter) -> Option<NativeKind> {
        None
    }

    /// Register the event sink. Replaces any earlier sink.
    fn subscribe_events(&self, sink: EventSink);

    fn start_video(&self) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    fn stop_video(&self) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    /// Video streams the driver offers
    fn video_streams(&self) -> DriverResult<Vec<StreamDescriptor>> {
        Ok(Vec::new())
    }

    fn start_video_streaming(&self, _stream_id: i32) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    fn stop_video_streaming(&self, _stream_id: i32) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    /// Restore every parameter to its driver default
    fn reset_settings(&self) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    /// Storage devices known to the driver; the first is the active one
    fn storage_devices(&self) -> DriverResult<Vec<StorageInformation>> {
        Err(DriverStatus::Unsupported)
    }

    /// Erase a storage device
    fn format_storage(&self, _storage_id: i32) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    /// Every capture in the storage index, in no particular order
    fn list_captures(&self) -> DriverResult<Vec<NativeCapture>> {
        Err(DriverStatus::Unsupported)
    }

    fn information(&self) -> DriverResult<CameraInformation> {
        Err(DriverStatus::Unsupported)
    }

    /// Camera endpoints managed by this driver
    fn camera_ids(&self) -> Vec<i32> {
        vec![0]
    }

    fn select_camera(&self, _camera_id: i32) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }

    /// Wall-clock time (UTC milliseconds) to embed in media metadata
    fn set_timestamp(&self, _timestamp_ms: i64) -> DriverResult<()> {
        Err(DriverStatus::Unsupported)
    }
}
