//! Native driver data types

use serde::{Deserialize, Serialize};

/// Operating mode as the driver sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverMode {
    Photo,
    Video,
}

/// Storage medium state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageStatus {
    #[default]
    NotAvailable,
    Unformatted,
    Formatted,
    NotSupported,
}

/// Storage medium kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageType {
    #[default]
    Unknown,
    UsbStick,
    Sd,
    Microsd,
    Hd,
    Other,
}

/// Capacity and availability of one storage device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageInformation {
    /// Storage device id (1-based, as used by format requests)
    pub storage_id: i32,
    pub storage_type: StorageType,
    pub status: StorageStatus,
    /// Total capacity (MiB)
    pub total_mib: f32,
    /// Used capacity (MiB)
    pub used_mib: f32,
    /// Free capacity (MiB)
    pub available_mib: f32,
    /// Folder new media is written to
    pub media_folder: String,
}

/// A capture produced by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeCapture {
    /// Location of the media file on the camera
    pub file_path: String,
    /// Capture time (UTC microseconds)
    pub time_utc_us: u64,
    /// Whether the capture succeeded
    pub success: bool,
}

/// Static description of the camera
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraInformation {
    pub vendor_name: String,
    pub model_name: String,
    pub firmware_version: String,
    pub focal_length_mm: f32,
    pub horizontal_sensor_size_mm: f32,
    pub vertical_sensor_size_mm: f32,
    pub horizontal_resolution_px: u32,
    pub vertical_resolution_px: u32,
    pub lens_id: u32,
    pub definition_file_version: u32,
    pub definition_file_uri: String,
}

/// Light spectrum of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamSpectrum {
    #[default]
    Unknown,
    VisibleLight,
    Infrared,
}

/// A video stream endpoint offered by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub stream_id: i32,
    pub frame_rate_hz: f32,
    pub width: u32,
    pub height: u32,
    /// Bit rate (bits per second)
    pub bit_rate: u32,
    pub rotation_deg: u32,
    pub uri: String,
    pub horizontal_fov_deg: f32,
    pub spectrum: StreamSpectrum,
}
