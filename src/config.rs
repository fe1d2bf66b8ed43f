//! Layered handler options
//!
//! Every option is declared once in the root (generic) layer. More specific
//! handler kinds may override the default of a declared option; the most
//! derived kind wins. Instance overrides supplied by the caller are applied
//! last. Undeclared keys and values of the wrong JSON type are rejected.

use crate::error::{MediaError, Result};
use crate::handler::HandlerKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Ceiling on decoded pixels (width * height * frames)
pub const MAX_DECODED_PIXELS: &str = "max_decoded_pixels";
pub const FFPROBE_BINARIES: &str = "ffprobe_binaries";
pub const EXIFTOOL_BINARY: &str = "exiftool_binary";
pub const EXIF_NATIVE_FALLBACK: &str = "exif_native_fallback";
pub const RASTERIZER_BINARIES: &str = "rasterizer_binaries";
pub const ZXING_BINARIES: &str = "zxing_binaries";
pub const ZBAR_BINARIES: &str = "zbar_binaries";
pub const FACEDETECT_BINARIES: &str = "facedetect_binaries";
pub const RASTER_DENSITY: &str = "raster_density";
/// JSON colour-name table; empty selects the bundled CSS colours
pub const COLOR_NAMES_FILE: &str = "color_names_file";

/// Defaults contributed by a single handler kind.
fn layer(kind: HandlerKind) -> Vec<(&'static str, Value)> {
    match kind {
        HandlerKind::Generic => vec![
            (MAX_DECODED_PIXELS, json!(89_478_485u64)),
            (FFPROBE_BINARIES, json!(["ffprobe", "avprobe"])),
            (EXIFTOOL_BINARY, json!("exiftool")),
            (EXIF_NATIVE_FALLBACK, json!(true)),
            (RASTERIZER_BINARIES, json!(["convert", "magick"])),
            (ZXING_BINARIES, json!(["ZXingReader", "zxingcpp"])),
            (ZBAR_BINARIES, json!(["zbarimg"])),
            (FACEDETECT_BINARIES, json!(["facedetect"])),
            (RASTER_DENSITY, json!(96u64)),
            (COLOR_NAMES_FILE, json!("")),
        ],
        HandlerKind::Svg => vec![(
            RASTERIZER_BINARIES,
            json!(["rsvg-convert", "convert", "magick"]),
        )],
        HandlerKind::Xcf => vec![(RASTER_DENSITY, json!(72u64))],
        _ => Vec::new(),
    }
}

/// Caller-supplied option values, applied on top of the kind's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigOverrides {
    values: BTreeMap<String, Value>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| MediaError::InvalidConfig(format!("bad override document: {}", e)))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MediaError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Parse a `key=value` assignment. The value is read as JSON when it
    /// parses, otherwise as a plain string.
    pub fn parse_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, raw) = assignment.split_once('=').ok_or_else(|| {
            MediaError::InvalidConfig(format!("expected key=value, got {:?}", assignment))
        })?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.values.insert(key.trim().to_string(), value);
        Ok(())
    }
}

/// Resolved options for one handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    /// Resolve defaults for `kind` (root first, most derived last), then
    /// apply `overrides`.
    pub fn for_kind(kind: HandlerKind, overrides: &ConfigOverrides) -> Result<Self> {
        let mut values: BTreeMap<String, Value> = BTreeMap::new();
        for ancestor in kind.lineage().into_iter().rev() {
            for (key, value) in layer(ancestor) {
                values.insert(key.to_string(), value);
            }
        }

        for (key, value) in &overrides.values {
            let current = values.get(key).ok_or_else(|| {
                MediaError::InvalidConfig(format!("unknown option {:?}", key))
            })?;
            if !same_shape(current, value) {
                return Err(MediaError::TypeMismatch {
                    key: key.clone(),
                    expected: type_name(current),
                });
            }
            values.insert(key.clone(), value.clone());
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| MediaError::InvalidConfig(format!("unknown option {:?}", key)))
    }

    pub fn get_u64(&self, key: &str) -> Result<u64> {
        self.get(key)?.as_u64().ok_or_else(|| MediaError::TypeMismatch {
            key: key.to_string(),
            expected: "unsigned integer",
        })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)?.as_bool().ok_or_else(|| MediaError::TypeMismatch {
            key: key.to_string(),
            expected: "boolean",
        })
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get(key)?.as_str().ok_or_else(|| MediaError::TypeMismatch {
            key: key.to_string(),
            expected: "string",
        })
    }

    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>> {
        let mismatch = || MediaError::TypeMismatch {
            key: key.to_string(),
            expected: "list of strings",
        };
        self.get(key)?
            .as_array()
            .ok_or_else(mismatch)?
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(mismatch))
            .collect()
    }
}

fn same_shape(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.is_u64() == y.is_u64(),
        (Value::Array(_), Value::Array(items)) => items.iter().all(Value::is_string),
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_u64() => "unsigned integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list of strings",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_defaults() {
        let config = Config::for_kind(HandlerKind::Generic, &ConfigOverrides::new()).unwrap();
        assert_eq!(config.get_u64(MAX_DECODED_PIXELS).unwrap(), 89_478_485);
        assert_eq!(
            config.get_str_list(FFPROBE_BINARIES).unwrap(),
            vec!["ffprobe".to_string(), "avprobe".to_string()]
        );
    }

    #[test]
    fn test_most_derived_layer_wins() {
        let svg = Config::for_kind(HandlerKind::Svg, &ConfigOverrides::new()).unwrap();
        assert_eq!(svg.get_str_list(RASTERIZER_BINARIES).unwrap()[0], "rsvg-convert");

        let xcf = Config::for_kind(HandlerKind::Xcf, &ConfigOverrides::new()).unwrap();
        assert_eq!(xcf.get_u64(RASTER_DENSITY).unwrap(), 72);
        assert_eq!(xcf.get_str_list(RASTERIZER_BINARIES).unwrap()[0], "convert");

        let jpeg = Config::for_kind(HandlerKind::Jpeg, &ConfigOverrides::new()).unwrap();
        assert_eq!(jpeg.get_u64(RASTER_DENSITY).unwrap(), 96);
    }

    #[test]
    fn test_instance_override_beats_layers() {
        let overrides = ConfigOverrides::new().set(RASTER_DENSITY, 300u64);
        let xcf = Config::for_kind(HandlerKind::Xcf, &overrides).unwrap();
        assert_eq!(xcf.get_u64(RASTER_DENSITY).unwrap(), 300);
    }

    #[test]
    fn test_unknown_override_rejected() {
        let overrides = ConfigOverrides::new().set("max_pixels", 10u64);
        let err = Config::for_kind(HandlerKind::Image, &overrides).unwrap_err();
        assert!(matches!(err, MediaError::InvalidConfig(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_wrong_type_override_rejected() {
        let overrides = ConfigOverrides::new().set(MAX_DECODED_PIXELS, "lots");
        let err = Config::for_kind(HandlerKind::Image, &overrides).unwrap_err();
        assert!(matches!(err, MediaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_getter_type_mismatch() {
        let config = Config::for_kind(HandlerKind::Generic, &ConfigOverrides::new()).unwrap();
        assert!(matches!(
            config.get_bool(MAX_DECODED_PIXELS),
            Err(MediaError::TypeMismatch { .. })
        ));
        assert!(matches!(config.get_u64("nope"), Err(MediaError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_assignment() {
        let mut overrides = ConfigOverrides::new();
        overrides.parse_assignment("max_decoded_pixels=1000").unwrap();
        overrides.parse_assignment("exiftool_binary=/opt/exiftool").unwrap();
        assert!(overrides.parse_assignment("no-equals-sign").is_err());

        let config = Config::for_kind(HandlerKind::Generic, &overrides).unwrap();
        assert_eq!(config.get_u64(MAX_DECODED_PIXELS).unwrap(), 1000);
        assert_eq!(config.get_str(EXIFTOOL_BINARY).unwrap(), "/opt/exiftool");
    }

    #[test]
    fn test_overrides_from_json() {
        let overrides =
            ConfigOverrides::from_json_str(r#"{"zbar_binaries": ["/usr/local/bin/zbarimg"]}"#)
                .unwrap();
        let config = Config::for_kind(HandlerKind::Png, &overrides).unwrap();
        assert_eq!(config.get_str_list(ZBAR_BINARIES).unwrap(), vec!["/usr/local/bin/zbarimg"]);
        assert!(ConfigOverrides::from_json_str("[1, 2]").is_err());
    }
}
