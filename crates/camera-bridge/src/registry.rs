//! Settings Translation Registry
//!
//! Maps protocol setting ids to driver parameters. Each binding carries a
//! codec (protocol string <-> native value), a value domain used for
//! validation, and the modes in which the setting is not applicable.
//!
//! Bindings come from the definition document alone: the codec follows the
//! declared type, and a driver that advertises native kinds can refine it.

use crate::definition::{CameraDefinition, ParameterDefinition, ValueType};
use crate::error::CameraError;
use crate::types::{Mode, Setting, SettingOption, SettingOptions};
use camera_driver::{NativeKind, NativeValue, Parameter};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Upper bound on options rendered from a numeric range
const MAX_RANGE_OPTIONS: usize = 1000;

/// Relative tolerance when matching float values against options
const FLOAT_TOLERANCE: f64 = 1e-4;

/// Render a float the way option ids are written: at most six decimals, at
/// least one fractional digit.
pub fn format_float(value: f64) -> String {
    let mut rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

fn floats_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_TOLERANCE * a.abs().max(b.abs()).max(1e-9)
}

/// Conversion between protocol strings and native values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Option index
    Enum,
    /// Integer quantity
    Integer,
    /// Float quantity
    Float,
}

impl Codec {
    fn for_kind(kind: NativeKind) -> Self {
        match kind {
            NativeKind::Enum => Codec::Enum,
            NativeKind::Integer => Codec::Integer,
            NativeKind::Float => Codec::Float,
        }
    }

    /// Parse a protocol value
    pub fn encode(&self, raw: &str) -> Result<NativeValue, CameraError> {
        let raw = raw.trim();
        let invalid = || CameraError::InvalidArgument(format!("malformed setting value {:?}", raw));
        match self {
            Codec::Enum => raw.parse::<u32>().map(NativeValue::Enum).map_err(|_| invalid()),
            Codec::Integer => raw
                .parse::<i64>()
                .map(NativeValue::Integer)
                .map_err(|_| invalid()),
            Codec::Float => raw
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(NativeValue::Float)
                .ok_or_else(invalid),
        }
    }
}

fn numeric(value: NativeValue) -> f64 {
    match value {
        NativeValue::Enum(v) => f64::from(v),
        NativeValue::Integer(v) => v as f64,
        NativeValue::Float(v) => f64::from(v),
    }
}

/// Legal values of a setting
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Fixed, ordered option list
    Options(Vec<SettingOption>),
    /// Numeric range rendered as discrete options
    Range { min: f64, max: f64, step: f64 },
}

impl Domain {
    /// Ordered option list, rendering a range by its step
    pub fn options(&self) -> Vec<SettingOption> {
        match self {
            Domain::Options(options) => options.clone(),
            Domain::Range { min, max, step } => {
                let mut options = Vec::new();
                let mut i = 0usize;
                loop {
                    let value = min + step * i as f64;
                    if value > max + step * FLOAT_TOLERANCE || options.len() >= MAX_RANGE_OPTIONS {
                        break;
                    }
                    let id = format_float(value);
                    options.push(SettingOption {
                        option_id: id.clone(),
                        option_description: id,
                    });
                    i += 1;
                }
                options
            }
        }
    }

    fn is_range(&self) -> bool {
        matches!(self, Domain::Range { .. })
    }

    /// Check `value` against the domain, returning the canonical native value
    fn validate(&self, codec: Codec, value: NativeValue) -> Option<NativeValue> {
        let v = numeric(value);
        match self {
            Domain::Range { min, max, .. } => {
                let slack = FLOAT_TOLERANCE * min.abs().max(max.abs()).max(1.0);
                (v >= min - slack && v <= max + slack).then_some(value)
            }
            Domain::Options(options) => options
                .iter()
                .filter_map(|o| codec.encode(&o.option_id).ok())
                .find(|candidate| match codec {
                    Codec::Float => floats_match(numeric(*candidate), v),
                    Codec::Enum | Codec::Integer => numeric(*candidate) == v,
                }),
        }
    }

    /// Nearest listed option to a float value
    fn nearest(&self, value: f64) -> Option<&SettingOption> {
        let Domain::Options(options) = self else {
            return None;
        };
        options
            .iter()
            .filter_map(|o| o.option_id.trim().parse::<f64>().ok().map(|v| (o, (v - value).abs())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(o, _)| o)
    }
}

/// One registered setting
#[derive(Debug, Clone, PartialEq)]
pub struct SettingBinding {
    pub id: String,
    pub description: String,
    pub parameter: Parameter,
    pub codec: Codec,
    pub domain: Domain,
    /// Modes in which the setting is not applicable
    pub excluded_in: Vec<Mode>,
    /// Default option id from the definition document, if it is a legal value
    pub default: Option<String>,
}

impl SettingBinding {
    /// Whether the setting applies in `mode`. In `Unknown` mode only settings
    /// applicable in every mode apply.
    pub fn is_applicable(&self, mode: Mode) -> bool {
        match mode {
            Mode::Unknown => self.excluded_in.is_empty(),
            mode => !self.excluded_in.contains(&mode),
        }
    }

    /// Native form of the definition default
    pub fn default_value(&self) -> Option<NativeValue> {
        self.encode(self.default.as_deref()?).ok()
    }

    /// Decode a protocol value and validate it against the domain
    pub fn encode(&self, raw: &str) -> Result<NativeValue, CameraError> {
        let value = self.codec.encode(raw)?;
        self.domain.validate(self.codec, value).ok_or_else(|| {
            CameraError::InvalidArgument(format!("{} is not a legal value of {}", raw.trim(), self.id))
        })
    }

    /// Render a native value in protocol form
    pub fn decode(&self, value: NativeValue) -> Setting {
        let option_id = match (self.codec, value) {
            (Codec::Float, value) => {
                let v = numeric(value);
                match self.domain.nearest(v) {
                    Some(option) => option.option_id.clone(),
                    None => format_float(v),
                }
            }
            (_, NativeValue::Float(v)) => format!("{}", v.round() as i64),
            (_, NativeValue::Enum(v)) => v.to_string(),
            (_, NativeValue::Integer(v)) => v.to_string(),
        };

        let option_description = match &self.domain {
            Domain::Options(options) => options
                .iter()
                .find(|o| o.option_id == option_id)
                .map(|o| o.option_description.clone())
                .unwrap_or_else(|| option_id.clone()),
            Domain::Range { .. } => option_id.clone(),
        };

        Setting {
            setting_id: self.id.clone(),
            setting_description: self.description.clone(),
            option: SettingOption {
                option_id,
                option_description,
            },
            is_range: self.domain.is_range(),
        }
    }

    pub fn setting_options(&self) -> SettingOptions {
        SettingOptions {
            setting_id: self.id.clone(),
            setting_description: self.description.clone(),
            options: self.domain.options(),
            is_range: self.domain.is_range(),
        }
    }
}

/// Registry of settings, built from a camera definition
#[derive(Debug, Clone, Default)]
pub struct SettingsRegistry {
    bindings: Vec<SettingBinding>,
    index: HashMap<String, usize>,
}

impl SettingsRegistry {
    /// Registry built from the bundled definition
    pub fn bundled() -> Result<Self, CameraError> {
        Ok(Self::from_definition(&CameraDefinition::bundled()?))
    }

    /// Build a binding for every parameter of the definition
    pub fn from_definition(definition: &CameraDefinition) -> Self {
        let mut registry = SettingsRegistry::default();

        for parameter_def in &definition.parameters {
            let Some(binding) = Self::bind(parameter_def, definition) else {
                continue;
            };
            if registry.index.contains_key(&binding.id) {
                warn!("Duplicate setting {} in definition, keeping first", binding.id);
                continue;
            }
            registry.index.insert(binding.id.clone(), registry.bindings.len());
            registry.bindings.push(binding);
        }

        info!(
            "Settings registry built from {} {} v{}: {} settings",
            definition.vendor,
            definition.model,
            definition.version,
            registry.bindings.len()
        );
        registry
    }

    fn bind(def: &ParameterDefinition, definition: &CameraDefinition) -> Option<SettingBinding> {
        let codec = match def.value_type {
            ValueType::Float => Codec::Float,
            ValueType::Integer if def.options.is_empty() => Codec::Integer,
            ValueType::Integer => Codec::Enum,
        };

        let domain = if def.options.is_empty() {
            let range = def.range?;
            Domain::Range {
                min: range.min,
                max: range.max,
                step: range.step,
            }
        } else {
            Domain::Options(
                def.options
                    .iter()
                    .map(|o| SettingOption {
                        option_id: o.value.clone(),
                        option_description: o.name.clone(),
                    })
                    .collect(),
            )
        };

        let excluded_in = definition
            .mode_exclusions
            .iter()
            .filter(|(_, excluded)| excluded.iter().any(|e| e == &def.name))
            .map(|(mode, _)| *mode)
            .collect();

        let mut binding = SettingBinding {
            id: def.name.clone(),
            description: def.description.clone(),
            parameter: Parameter::new(def.name.as_str()),
            codec,
            domain,
            excluded_in,
            default: None,
        };
        binding.default = def.default.clone().filter(|raw| {
            let legal = binding.encode(raw).is_ok();
            if !legal {
                warn!("Default {:?} of {} is not a legal value, ignoring", raw, def.name);
            }
            legal
        });

        debug!("Bound setting {} as {:?}", def.name, codec);
        Some(binding)
    }

    /// Adopt the native kinds a driver advertises. A binding whose declared
    /// type contradicts the driver (float versus integer) is dropped.
    pub fn with_native_kinds<F>(self, native_kind: F) -> Self
    where
        F: Fn(&Parameter) -> Option<NativeKind>,
    {
        let mut registry = SettingsRegistry::default();

        for mut binding in self.bindings {
            if let Some(kind) = native_kind(&binding.parameter) {
                let codec = Codec::for_kind(kind);
                if (codec == Codec::Float) != (binding.codec == Codec::Float) {
                    warn!(
                        "Setting {} declared {:?} but driver reports {:?}, skipping",
                        binding.id, binding.codec, kind
                    );
                    continue;
                }
                binding.codec = codec;
            }
            registry.index.insert(binding.id.clone(), registry.bindings.len());
            registry.bindings.push(binding);
        }

        registry
    }

    pub fn binding(&self, setting_id: &str) -> Option<&SettingBinding> {
        self.index.get(setting_id).map(|&i| &self.bindings[i])
    }

    /// Binding for a setting that must be applicable in `mode`
    pub fn applicable_binding(
        &self,
        setting_id: &str,
        mode: Mode,
    ) -> Result<&SettingBinding, CameraError> {
        let binding = self
            .binding(setting_id)
            .ok_or_else(|| CameraError::Unsupported(format!("unknown setting {}", setting_id)))?;
        if !binding.is_applicable(mode) {
            return Err(CameraError::Unsupported(format!(
                "setting {} not applicable in {:?} mode",
                setting_id, mode
            )));
        }
        Ok(binding)
    }

    /// Every setting, in definition order
    pub fn iter(&self) -> std::slice::Iter<'_, SettingBinding> {
        self.bindings.iter()
    }

    /// Settings applicable in `mode`, in definition order
    pub fn applicable(&self, mode: Mode) -> impl Iterator<Item = &SettingBinding> {
        self.bindings.iter().filter(move |b| b.is_applicable(mode))
    }

    /// Option domains of the settings applicable in `mode`
    pub fn setting_options(&self, mode: Mode) -> Vec<SettingOptions> {
        self.applicable(mode).map(SettingBinding::setting_options).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_driver::{CameraDriver, SimulatedDriver};
    use proptest::prelude::*;

    fn registry() -> SettingsRegistry {
        SettingsRegistry::bundled().unwrap()
    }

    #[test]
    fn test_bundled_registry() {
        let registry = registry();
        assert_eq!(registry.len(), 11);
        let iso = registry.binding("CAM_ISO").unwrap();
        assert_eq!(iso.parameter, Parameter::new(Parameter::ISO));
        assert_eq!(iso.codec, Codec::Enum);
        assert_eq!(registry.binding("CAM_EV").unwrap().codec, Codec::Float);
        assert!(registry.binding("CAM_MODE").is_none());
    }

    #[test]
    fn test_driver_kinds_refine_codecs() {
        let sim = SimulatedDriver::new();
        let registry = registry().with_native_kinds(|p| sim.parameter_kind(p));
        assert_eq!(registry.len(), 11);
        let iso = registry.binding("CAM_ISO").unwrap();
        assert_eq!(iso.codec, Codec::Integer);
        assert_eq!(iso.encode("6400"), Ok(NativeValue::Integer(6400)));
        assert_eq!(registry.binding("CAM_WBMODE").unwrap().codec, Codec::Enum);
    }

    #[test]
    fn test_definition_defaults() {
        let registry = registry();
        let iso = registry.binding("CAM_ISO").unwrap();
        assert_eq!(iso.default.as_deref(), Some("100"));
        assert_eq!(iso.default_value(), Some(NativeValue::Enum(100)));

        let document = r#"
            <parameters>
                <parameter name="CAM_WBMODE" type="uint32" default="7">
                    <options><option name="Auto" value="0"/></options>
                </parameter>
            </parameters>"#;
        let registry = SettingsRegistry::from_definition(&CameraDefinition::parse(document).unwrap());
        assert_eq!(registry.binding("CAM_WBMODE").unwrap().default, None);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(-0.0), "0.0");
        assert_eq!(format_float(f64::from(0.016666f32)), "0.016666");
        assert_eq!(format_float(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_enum_validation() {
        let registry = registry();
        let wb = registry.binding("CAM_WBMODE").unwrap();
        assert_eq!(wb.encode("1"), Ok(NativeValue::Enum(1)));
        assert!(matches!(wb.encode("9"), Err(CameraError::InvalidArgument(_))));
        assert!(matches!(wb.encode("auto"), Err(CameraError::InvalidArgument(_))));
    }

    #[test]
    fn test_float_option_snapping() {
        let registry = registry();
        let shutter = registry.binding("CAM_SHUTTERSPD").unwrap();
        assert_eq!(shutter.encode("0.016666"), Ok(NativeValue::Float(0.016666)));
        assert!(shutter.encode("0.02").is_err());

        // Driver approximation is reported as the nearest listed option
        let setting = shutter.decode(NativeValue::Float(0.0166));
        assert_eq!(setting.option.option_id, "0.016666");
        assert_eq!(setting.option.option_description, "1/60");
    }

    #[test]
    fn test_range_setting() {
        let registry = registry();
        let ev = registry.binding("CAM_EV").unwrap();
        assert_eq!(ev.encode("2.0"), Ok(NativeValue::Float(2.0)));
        assert!(ev.encode("3.5").is_err());
        assert_eq!(ev.decode(NativeValue::Float(2.0)).option.option_id, "2.0");

        let options = ev.setting_options();
        assert!(options.is_range);
        assert_eq!(options.options.len(), 13);
        assert_eq!(options.options[0].option_id, "-3.0");
        assert_eq!(options.options[12].option_id, "3.0");
    }

    #[test]
    fn test_mode_scoping() {
        let registry = registry();
        let video: Vec<_> = registry.applicable(Mode::Video).map(|b| b.id.as_str()).collect();
        assert!(video.contains(&"CAM_VIDFMT"));
        assert!(video.contains(&"CAM_VIDRES"));
        assert!(!video.contains(&"CAM_PHOTORATIO"));

        let photo: Vec<_> = registry.applicable(Mode::Photo).map(|b| b.id.as_str()).collect();
        assert!(photo.contains(&"CAM_PHOTORATIO"));
        assert!(!photo.contains(&"CAM_VIDRES"));

        let unknown: Vec<_> = registry.applicable(Mode::Unknown).map(|b| b.id.as_str()).collect();
        assert!(unknown.contains(&"CAM_ISO"));
        assert!(!unknown.contains(&"CAM_VIDRES"));
        assert!(!unknown.contains(&"CAM_PHOTORATIO"));
    }

    #[test]
    fn test_applicable_binding_errors() {
        let registry = registry();
        assert!(matches!(
            registry.applicable_binding("CAM_NOPE", Mode::Photo),
            Err(CameraError::Unsupported(_))
        ));
        assert!(matches!(
            registry.applicable_binding("CAM_VIDRES", Mode::Photo),
            Err(CameraError::Unsupported(_))
        ));
        assert!(registry.applicable_binding("CAM_VIDRES", Mode::Video).is_ok());
    }

    #[test]
    fn test_unlisted_parameter_binds() {
        let document = r#"
            <parameters>
                <parameter name="CAM_ZOOM" type="float" min="1.0" max="4.0" step="0.5"/>
                <parameter name="CAM_ISO" type="float" min="100" max="6400"/>
                <parameter name="CAM_WBMODE" type="uint32" default="0">
                    <options><option name="Auto" value="0"/></options>
                </parameter>
            </parameters>"#;
        let registry = SettingsRegistry::from_definition(&CameraDefinition::parse(document).unwrap());
        assert_eq!(registry.len(), 3);

        let zoom = registry.binding("CAM_ZOOM").unwrap();
        assert_eq!(zoom.parameter.name(), "CAM_ZOOM");
        let native = zoom.encode("2.5").unwrap();
        assert_eq!(zoom.decode(native).option.option_id, "2.5");

        // The driver reports CAM_ISO as an integer, contradicting the document
        let sim = SimulatedDriver::new();
        let registry = registry.with_native_kinds(|p| sim.parameter_kind(p));
        assert_eq!(registry.len(), 2);
        assert!(registry.binding("CAM_ISO").is_none());
        assert_eq!(registry.binding("CAM_ZOOM").unwrap().codec, Codec::Float);
    }

    proptest! {
        #[test]
        fn prop_every_option_round_trips(index in 0usize..64) {
            let registry = registry();
            for binding in registry.applicable(Mode::Photo).chain(registry.applicable(Mode::Video)) {
                let options = binding.domain.options();
                let option = &options[index % options.len()];
                let native = binding.encode(&option.option_id).unwrap();
                prop_assert_eq!(&binding.decode(native).option.option_id, &option.option_id);
            }
        }

        #[test]
        fn prop_range_accepts_interior(v in -3.0f32..=3.0f32) {
            let registry = registry();
            let ev = registry.binding("CAM_EV").unwrap();
            prop_assert!(ev.encode(&v.to_string()).is_ok());
        }
    }
}
