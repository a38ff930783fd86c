//! Camera definition document parsing
//!
//! Reads the MAVLink camera definition XML that describes the settings
//! domain. Parsing is tolerant tag scanning: unknown elements are ignored and
//! missing attributes fall back to defaults.

use crate::error::CameraError;
use crate::types::Mode;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Definition bundled with the crate, used until a camera supplies its own
pub const BUNDLED_DEFINITION: &str = include_str!("../resources/camera_definition.xml");

/// Name of the parameter whose options carry the per-mode exclusions
const MODE_PARAMETER: &str = "CAM_MODE";

/// Declared value type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    Float,
}

impl ValueType {
    fn parse(raw: &str) -> Option<ValueType> {
        match raw {
            "float" | "double" => Some(ValueType::Float),
            "bool" | "uint8" | "int8" | "uint16" | "int16" | "uint32" | "int32" | "uint64"
            | "int64" => Some(ValueType::Integer),
            _ => None,
        }
    }
}

/// One `<option>` of a parameter
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDefinition {
    /// Label
    pub name: String,
    /// Value as sent over the protocol
    pub value: String,
    /// Parameters that do not apply while this option is selected
    pub exclusions: Vec<String>,
}

/// Numeric range of a parameter without an option list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeDefinition {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// One `<parameter>` of the document
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    pub value_type: ValueType,
    pub default: Option<String>,
    pub description: String,
    pub options: Vec<OptionDefinition>,
    pub range: Option<RangeDefinition>,
}

/// Parsed camera definition document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraDefinition {
    pub version: u32,
    pub model: String,
    pub vendor: String,
    /// Setting parameters, in document order (the mode parameter excluded)
    pub parameters: Vec<ParameterDefinition>,
    /// Parameters excluded per mode
    pub mode_exclusions: HashMap<Mode, Vec<String>>,
}

impl CameraDefinition {
    /// Parse the bundled definition
    pub fn bundled() -> Result<Self, CameraError> {
        Self::parse(BUNDLED_DEFINITION)
    }

    /// Parse a definition document
    pub fn parse(document: &str) -> Result<Self, CameraError> {
        let mut definition = CameraDefinition::default();

        if let Some(header) = elements(document, "definition").into_iter().next() {
            definition.version = attribute(header.attrs, "version")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            definition.model = text(header.body, "model").unwrap_or_default();
            definition.vendor = text(header.body, "vendor").unwrap_or_default();
        }

        let parameters = elements(document, "parameter");
        if parameters.is_empty() {
            return Err(CameraError::InvalidArgument(
                "camera definition has no parameters".to_string(),
            ));
        }

        for element in parameters {
            let Some(name) = attribute(element.attrs, "name") else {
                warn!("Skipping parameter without name");
                continue;
            };
            let options = parse_options(element.body);

            if name == MODE_PARAMETER {
                for option in &options {
                    let mode = match option.value.trim() {
                        "0" => Mode::Photo,
                        "1" => Mode::Video,
                        other => {
                            warn!("Ignoring unknown camera mode option {}", other);
                            continue;
                        }
                    };
                    definition
                        .mode_exclusions
                        .insert(mode, option.exclusions.clone());
                }
                continue;
            }

            let raw_type = attribute(element.attrs, "type").unwrap_or_default();
            let Some(value_type) = ValueType::parse(&raw_type) else {
                warn!("Skipping parameter {} with unsupported type {:?}", name, raw_type);
                continue;
            };

            let range = match (
                attribute(element.attrs, "min").and_then(|v| v.parse::<f64>().ok()),
                attribute(element.attrs, "max").and_then(|v| v.parse::<f64>().ok()),
            ) {
                (Some(min), Some(max)) if min <= max => Some(RangeDefinition {
                    min,
                    max,
                    step: attribute(element.attrs, "step")
                        .and_then(|v| v.parse::<f64>().ok())
                        .filter(|s| *s > 0.0)
                        .unwrap_or(1.0),
                }),
                _ => None,
            };

            if options.is_empty() && range.is_none() {
                warn!("Skipping parameter {} without options or range", name);
                continue;
            }

            debug!(
                "Definition parameter {} ({:?}, {} options)",
                name,
                value_type,
                options.len()
            );
            definition.parameters.push(ParameterDefinition {
                description: text(element.body, "description").unwrap_or_else(|| name.clone()),
                default: attribute(element.attrs, "default"),
                name,
                value_type,
                options,
                range,
            });
        }

        Ok(definition)
    }
}

fn parse_options(body: &str) -> Vec<OptionDefinition> {
    elements(body, "option")
        .into_iter()
        .filter_map(|option| {
            let value = attribute(option.attrs, "value")?;
            Some(OptionDefinition {
                name: attribute(option.attrs, "name").unwrap_or_else(|| value.clone()),
                exclusions: elements(option.body, "exclude")
                    .into_iter()
                    .map(|e| decode_entities(e.body.trim()))
                    .filter(|e| !e.is_empty())
                    .collect(),
                value,
            })
        })
        .collect()
}

/// A located element: the attribute text of its start tag and its body
struct Element<'a> {
    attrs: &'a str,
    body: &'a str,
}

/// Find every `<tag ...>` element in `xml`. Same-name nesting is not supported.
fn elements<'a>(xml: &'a str, tag: &str) -> Vec<Element<'a>> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(open.as_str()) {
        let after_name = &rest[start + open.len()..];
        // Reject prefixes of longer tag names (<option> vs <options>)
        match after_name.chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => {}
            _ => {
                rest = after_name;
                continue;
            }
        }

        let Some(tag_end) = after_name.find('>') else {
            break;
        };
        let start_tag = &after_name[..tag_end];
        let after_start = &after_name[tag_end + 1..];

        if let Some(attrs) = start_tag.strip_suffix('/') {
            found.push(Element { attrs, body: "" });
            rest = after_start;
            continue;
        }

        match after_start.find(close.as_str()) {
            Some(body_end) => {
                found.push(Element {
                    attrs: start_tag,
                    body: &after_start[..body_end],
                });
                rest = &after_start[body_end + close.len()..];
            }
            None => {
                found.push(Element {
                    attrs: start_tag,
                    body: after_start,
                });
                break;
            }
        }
    }

    found
}

/// Value of attribute `name` within a start tag's attribute text
fn attribute(attrs: &str, name: &str) -> Option<String> {
    let pattern = format!("{}=", name);
    let mut search = attrs;

    while let Some(idx) = search.find(pattern.as_str()) {
        let preceded_ok = search[..idx]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        let after = &search[idx + pattern.len()..];
        if preceded_ok {
            let quote = after.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let value = &after[1..];
            let end = value.find(quote)?;
            return Some(decode_entities(&value[..end]));
        }
        search = after;
    }

    None
}

/// Trimmed text of the first `<tag>` in `xml`
fn text(xml: &str, tag: &str) -> Option<String> {
    elements(xml, tag)
        .into_iter()
        .next()
        .map(|e| decode_entities(e.body.trim()))
        .filter(|t| !t.is_empty())
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_definition() {
        let definition = CameraDefinition::bundled().unwrap();
        assert_eq!(definition.model, "C10");
        assert_eq!(definition.version, 1);
        assert!(definition.parameters.iter().all(|p| p.name != "CAM_MODE"));

        let photo = &definition.mode_exclusions[&Mode::Photo];
        assert!(photo.contains(&"CAM_VIDRES".to_string()));
        let video = &definition.mode_exclusions[&Mode::Video];
        assert!(video.contains(&"CAM_PHOTORATIO".to_string()));
    }

    #[test]
    fn test_range_parameter() {
        let definition = CameraDefinition::bundled().unwrap();
        let ev = definition
            .parameters
            .iter()
            .find(|p| p.name == "CAM_EV")
            .unwrap();
        assert_eq!(ev.value_type, ValueType::Float);
        assert!(ev.options.is_empty());
        assert_eq!(
            ev.range,
            Some(RangeDefinition {
                min: -3.0,
                max: 3.0,
                step: 0.5
            })
        );
    }

    #[test]
    fn test_option_entities_decoded() {
        let definition = CameraDefinition::bundled().unwrap();
        let shutter = definition
            .parameters
            .iter()
            .find(|p| p.name == "CAM_SHUTTERSPD")
            .unwrap();
        assert_eq!(shutter.options.last().unwrap().name, "1\"");
    }

    #[test]
    fn test_empty_document_rejected() {
        let result = CameraDefinition::parse("<mavlinkcamera></mavlinkcamera>");
        assert!(matches!(result, Err(CameraError::InvalidArgument(_))));
    }

    #[test]
    fn test_unsupported_type_skipped() {
        let document = r#"
            <parameters>
                <parameter name="CAM_NAME" type="custom" default="x">
                    <options><option name="x" value="x"/></options>
                </parameter>
                <parameter name='CAM_ISO' type='uint32' default='100'>
                    <options><option name='100' value='100'/></options>
                </parameter>
            </parameters>"#;
        let definition = CameraDefinition::parse(document).unwrap();
        assert_eq!(definition.parameters.len(), 1);
        assert_eq!(definition.parameters[0].name, "CAM_ISO");
        assert_eq!(definition.parameters[0].description, "CAM_ISO");
    }

    #[test]
    fn test_attribute_requires_word_boundary() {
        assert_eq!(
            attribute(r#" maxvalue="9" value="3""#, "value"),
            Some("3".to_string())
        );
    }
}
