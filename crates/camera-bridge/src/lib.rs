//! Camera Protocol Bridge
//!
//! Exposes a vendor-neutral camera command surface on top of a
//! [`camera_driver::CameraDriver`]:
//! - Settings translation between protocol strings and native parameters
//! - Consistent camera state shared by commands and driver events
//! - One replaceable subscriber per event category, plus poll variants
//! - Bounded waits on every driver call

mod bridge;
pub mod config;
pub mod definition;
pub mod dispatcher;
pub mod error;
mod executor;
mod interval;
pub mod registry;
mod tracker;
pub mod types;

pub use bridge::CameraBridge;
pub use config::BridgeConfig;
pub use definition::{CameraDefinition, BUNDLED_DEFINITION};
pub use dispatcher::Callback;
pub use error::{CameraError, CameraResult};
pub use registry::{SettingBinding, SettingsRegistry};
pub use types::{
    CaptureInfo, Information, Mode, PhotosRange, Position, Quaternion, Setting, SettingOption,
    SettingOptions, Status, StorageStatus, StorageType, VideoStreamInfo, VideoStreamSettings,
    VideoStreamSpectrum, VideoStreamStatus,
};
