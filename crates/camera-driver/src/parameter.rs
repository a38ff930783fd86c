//! Native Camera Parameters
//!
//! Parameters are keyed by the names used in camera definition documents, so
//! a new `<parameter>` entry reaches the driver without a code change here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Driver-native camera parameter, identified by its definition name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameter(String);

impl Parameter {
    pub const WHITE_BALANCE_MODE: &'static str = "CAM_WBMODE";
    pub const EXPOSURE_MODE: &'static str = "CAM_EXPMODE";
    pub const EXPOSURE_VALUE: &'static str = "CAM_EV";
    pub const ISO: &'static str = "CAM_ISO";
    pub const SHUTTER_SPEED: &'static str = "CAM_SHUTTERSPD";
    pub const VIDEO_FORMAT: &'static str = "CAM_VIDFMT";
    pub const VIDEO_RESOLUTION: &'static str = "CAM_VIDRES";
    pub const PHOTO_RATIO: &'static str = "CAM_PHOTORATIO";
    pub const PHOTO_FORMAT: &'static str = "CAM_PHOTOFMT";
    pub const METERING_MODE: &'static str = "CAM_METERING";
    pub const FLICKER: &'static str = "CAM_FLICKER";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Definition-document name of the parameter
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Parameter {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of a parameter's native value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeKind {
    Enum,
    Integer,
    Float,
}

/// Driver-native parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NativeValue {
    /// Index into a driver enumeration
    Enum(u32),
    /// Plain integer quantity (e.g. ISO 6400)
    Integer(i64),
    /// Floating point quantity (e.g. EV, seconds)
    Float(f32),
}

impl NativeValue {
    pub fn kind(&self) -> NativeKind {
        match self {
            NativeValue::Enum(_) => NativeKind::Enum,
            NativeValue::Integer(_) => NativeKind::Integer,
            NativeValue::Float(_) => NativeKind::Float,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_by_name() {
        let iso = Parameter::new(Parameter::ISO);
        assert_eq!(iso.name(), "CAM_ISO");
        assert_eq!(iso, Parameter::from("CAM_ISO"));
        assert_eq!(Parameter::from("CAM_ZOOM").to_string(), "CAM_ZOOM");
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(NativeValue::Integer(6400).kind(), NativeKind::Integer);
        assert_eq!(NativeValue::Float(0.5).kind(), NativeKind::Float);
        assert_eq!(NativeValue::Enum(2).kind(), NativeKind::Enum);
    }
}
