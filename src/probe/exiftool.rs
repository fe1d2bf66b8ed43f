//! Tag extraction with ExifTool, falling back to a native EXIF reader

use super::ToolCommand;
use crate::error::{MediaError, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Read all tags of a file as a `"Group:Tag"` keyed object.
///
/// When the ExifTool binary is missing and `native_fallback` is set, the
/// EXIF block is read in-process instead (keys `EXIF:<Tag>`).
pub fn read_tags(binary: &str, native_fallback: bool, path: &Path) -> Result<Value> {
    match run_exiftool(binary, path) {
        Err(MediaError::ProbeUnavailable(reason)) if native_fallback => {
            debug!("{}; reading EXIF natively", reason);
            read_native(path)
        }
        other => other,
    }
}

pub fn run_exiftool(binary: &str, path: &Path) -> Result<Value> {
    let output = ToolCommand::new([binary])
        .arg("-j") // JSON output
        .arg("-G") // Group names
        .arg("-n") // Numeric values
        .path(path)
        .execute()?;
    parse_exiftool_json(&output.stdout_text())
}

/// Parse the single-element array printed by `exiftool -j`.
pub fn parse_exiftool_json(text: &str) -> Result<Value> {
    let parsed: Vec<Map<String, Value>> = serde_json::from_str(text)
        .map_err(|e| MediaError::MalformedInput(format!("exiftool JSON: {}", e)))?;
    let mut tags = parsed
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::MalformedInput("exiftool returned no records".to_string()))?;
    tags.remove("SourceFile");
    Ok(Value::Object(tags))
}

/// Read primary-image EXIF fields with kamadak-exif. A file without an
/// EXIF block yields an empty object.
pub fn read_native(path: &Path) -> Result<Value> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif_data = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(data) => data,
        Err(exif::Error::NotFound(_)) => return Ok(Value::Object(Map::new())),
        Err(exif::Error::Io(e)) => return Err(MediaError::Tool(e)),
        Err(e) => return Err(MediaError::MalformedInput(format!("EXIF parse error: {}", e))),
    };

    let mut tags = Map::new();
    for field in exif_data.fields() {
        if field.ifd_num != exif::In::PRIMARY {
            continue;
        }
        let name = field.tag.to_string();
        // Unnamed tags print as "Tag(Context, number)"
        if name.starts_with("Tag(") {
            continue;
        }
        tags.insert(format!("EXIF:{}", name), field_value(field));
    }
    Ok(Value::Object(tags))
}

fn field_value(field: &exif::Field) -> Value {
    let single = match field.value {
        exif::Value::Ascii(ref parts) => {
            let text = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').to_string())
                .collect::<Vec<_>>()
                .join(" ");
            return Value::String(text);
        }
        exif::Value::Short(ref v) if v.len() == 1 => Some(Value::from(v[0])),
        exif::Value::Long(ref v) if v.len() == 1 => Some(Value::from(v[0])),
        exif::Value::Rational(ref v) if v.len() == 1 => {
            serde_json::Number::from_f64(v[0].to_f64()).map(Value::Number)
        }
        exif::Value::SRational(ref v) if v.len() == 1 => {
            serde_json::Number::from_f64(v[0].to_f64()).map(Value::Number)
        }
        _ => None,
    };
    single.unwrap_or_else(|| Value::String(field.display_value().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_exiftool_json() {
        let text = r#"[{
            "SourceFile": "test.jpg",
            "File:MIMEType": "image/jpeg",
            "EXIF:Software": "GIMP 2.10",
            "File:ImageWidth": 640
        }]"#;
        let tags = parse_exiftool_json(text).unwrap();
        assert_eq!(tags["EXIF:Software"], json!("GIMP 2.10"));
        assert_eq!(tags["File:ImageWidth"], json!(640));
        assert!(tags.get("SourceFile").is_none());
    }

    #[test]
    fn test_parse_exiftool_garbage() {
        assert!(matches!(
            parse_exiftool_json("Error: File not found"),
            Err(MediaError::MalformedInput(_))
        ));
        assert!(matches!(parse_exiftool_json("[]"), Err(MediaError::MalformedInput(_))));
    }

    #[test]
    fn test_native_without_exif_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();
        assert_eq!(read_native(&path).unwrap(), json!({}));
    }

    #[test]
    fn test_fallback_when_binary_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();

        assert_eq!(read_tags("no-such-exiftool", true, &path).unwrap(), json!({}));
        assert!(matches!(
            read_tags("no-such-exiftool", false, &path),
            Err(MediaError::ProbeUnavailable(_))
        ));
    }
}
