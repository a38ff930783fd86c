//! Protocol-level camera types
//!
//! These are the vendor-neutral records exchanged with remote callers. Native
//! driver records are converted here.

use camera_driver::{
    CameraInformation, DriverMode, NativeCapture, StorageInformation, StreamDescriptor,
    StreamSpectrum,
};
use serde::{Deserialize, Serialize};

/// Camera operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Unknown,
    Photo,
    Video,
}

impl Mode {
    /// Native driver mode, `None` for `Unknown`
    pub fn to_driver(self) -> Option<DriverMode> {
        match self {
            Mode::Unknown => None,
            Mode::Photo => Some(DriverMode::Photo),
            Mode::Video => Some(DriverMode::Video),
        }
    }
}

impl From<DriverMode> for Mode {
    fn from(mode: DriverMode) -> Self {
        match mode {
            DriverMode::Photo => Mode::Photo,
            DriverMode::Video => Mode::Video,
        }
    }
}

/// One legal value of a setting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingOption {
    /// Value as sent over the protocol
    pub option_id: String,
    /// Human readable label
    pub option_description: String,
}

/// A named setting and its current value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Setting {
    pub setting_id: String,
    pub setting_description: String,
    pub option: SettingOption,
    /// Whether the domain is a numeric range rather than a fixed list
    pub is_range: bool,
}

impl Setting {
    /// Build a request setting from an id and an option value
    pub fn new(setting_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self {
            setting_id: setting_id.into(),
            option: SettingOption {
                option_id: option_id.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Build a query setting carrying only an id
    pub fn query(setting_id: impl Into<String>) -> Self {
        Self {
            setting_id: setting_id.into(),
            ..Default::default()
        }
    }
}

/// Legal values of a setting
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingOptions {
    pub setting_id: String,
    pub setting_description: String,
    pub options: Vec<SettingOption>,
    pub is_range: bool,
}

/// Storage state as reported in Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageStatus {
    #[default]
    NotAvailable,
    Unformatted,
    Formatted,
    NotSupported,
}

/// Storage kind as reported in Status
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

impl From<camera_driver::StorageStatus> for StorageStatus {
    fn from(status: camera_driver::StorageStatus) -> Self {
        match status {
            camera_driver::StorageStatus::NotAvailable => StorageStatus::NotAvailable,
            camera_driver::StorageStatus::Unformatted => StorageStatus::Unformatted,
            camera_driver::StorageStatus::Formatted => StorageStatus::Formatted,
            camera_driver::StorageStatus::NotSupported => StorageStatus::NotSupported,
        }
    }
}

impl From<camera_driver::StorageType> for StorageType {
    fn from(kind: camera_driver::StorageType) -> Self {
        match kind {
            camera_driver::StorageType::Unknown => StorageType::Unknown,
            camera_driver::StorageType::UsbStick => StorageType::UsbStick,
            camera_driver::StorageType::Sd => StorageType::Sd,
            camera_driver::StorageType::Microsd => StorageType::Microsd,
            camera_driver::StorageType::Hd => StorageType::Hd,
            camera_driver::StorageType::Other => StorageType::Other,
        }
    }
}

/// Operational snapshot of the camera
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Status {
    pub video_on: bool,
    pub photo_interval_on: bool,
    pub used_storage_mib: f32,
    pub available_storage_mib: f32,
    pub total_storage_mib: f32,
    /// Elapsed time of the running recording (seconds)
    pub recording_time_s: f32,
    pub media_folder_name: String,
    pub storage_status: StorageStatus,
    pub storage_id: i32,
    pub storage_type: StorageType,
}

impl Status {
    /// Fill the storage part from a native storage record
    pub fn apply_storage(&mut self, storage: &StorageInformation) {
        self.used_storage_mib = storage.used_mib;
        self.available_storage_mib = storage.available_mib;
        self.total_storage_mib = storage.total_mib;
        self.media_folder_name = storage.media_folder.clone();
        self.storage_status = storage.status.into();
        self.storage_id = storage.storage_id;
        self.storage_type = storage.storage_type.into();
    }
}

/// Geographic position of a capture
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub absolute_altitude_m: f32,
    pub relative_altitude_m: f32,
}

/// Attitude of a capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// Description of one captured image
///
/// The default value, with `index == -1`, is the "no capture yet" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureInfo {
    pub position: Position,
    pub attitude_quaternion: Quaternion,
    pub time_utc_us: u64,
    pub is_success: bool,
    pub index: i32,
    pub file_url: String,
}

impl Default for CaptureInfo {
    fn default() -> Self {
        Self {
            position: Position::default(),
            attitude_quaternion: Quaternion::default(),
            time_utc_us: 0,
            is_success: false,
            index: -1,
            file_url: String::new(),
        }
    }
}

impl CaptureInfo {
    /// Convert a native capture, assigning the protocol index
    pub fn from_native(capture: &NativeCapture, index: i32) -> Self {
        Self {
            time_utc_us: capture.time_utc_us,
            is_success: capture.success,
            index,
            file_url: capture.file_path.clone(),
            ..Default::default()
        }
    }
}

/// Static camera description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Information {
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

impl From<CameraInformation> for Information {
    fn from(info: CameraInformation) -> Self {
        Self {
            vendor_name: info.vendor_name,
            model_name: info.model_name,
            firmware_version: info.firmware_version,
            focal_length_mm: info.focal_length_mm,
            horizontal_sensor_size_mm: info.horizontal_sensor_size_mm,
            vertical_sensor_size_mm: info.vertical_sensor_size_mm,
            horizontal_resolution_px: info.horizontal_resolution_px,
            vertical_resolution_px: info.vertical_resolution_px,
            lens_id: info.lens_id,
            definition_file_version: info.definition_file_version,
            definition_file_uri: info.definition_file_uri,
        }
    }
}

/// Video stream parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoStreamSettings {
    pub frame_rate_hz: f32,
    pub horizontal_resolution_pix: u32,
    pub vertical_resolution_pix: u32,
    pub bit_rate_b_s: u32,
    pub rotation_deg: u32,
    pub uri: String,
    pub horizontal_fov_deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoStreamStatus {
    #[default]
    NotRunning,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoStreamSpectrum {
    #[default]
    Unknown,
    VisibleLight,
    Infrared,
}

/// A video stream and whether it is running
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub stream_id: i32,
    pub settings: VideoStreamSettings,
    pub status: VideoStreamStatus,
    pub spectrum: VideoStreamSpectrum,
}

impl VideoStreamInfo {
    pub fn from_native(stream: &StreamDescriptor, running: bool) -> Self {
        Self {
            stream_id: stream.stream_id,
            settings: VideoStreamSettings {
                frame_rate_hz: stream.frame_rate_hz,
                horizontal_resolution_pix: stream.width,
                vertical_resolution_pix: stream.height,
                bit_rate_b_s: stream.bit_rate,
                rotation_deg: stream.rotation_deg,
                uri: stream.uri.clone(),
                horizontal_fov_deg: stream.horizontal_fov_deg,
            },
            status: if running {
                VideoStreamStatus::InProgress
            } else {
                VideoStreamStatus::NotRunning
            },
            spectrum: match stream.spectrum {
                StreamSpectrum::Unknown => VideoStreamSpectrum::Unknown,
                StreamSpectrum::VisibleLight => VideoStreamSpectrum::VisibleLight,
                StreamSpectrum::Infrared => VideoStreamSpectrum::Infrared,
            },
        }
    }
}

/// Which captures `list_photos` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotosRange {
    /// Every capture in the storage index
    All,
    /// Captures taken since the connection reference point
    SinceConnection,
}
