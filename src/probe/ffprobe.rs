//! ffprobe / avprobe stream inspection

use super::ToolCommand;
use crate::error::{MediaError, Result};
use crate::result::{record, AnalysisResult};
use serde_json::{json, Value};
use std::path::Path;

/// Run the first available prober and return its parsed JSON document.
pub fn probe(binaries: &[String], path: &Path) -> Result<Value> {
    let output = ToolCommand::new(binaries.iter().cloned())
        .args(["-v", "0", "-show_format", "-show_streams"])
        .path(super::absolute(path)?)
        .args(["-of", "json"])
        .execute()?;

    let text = output.stdout_text();
    let text = text.trim();
    if text.is_empty() {
        return Err(MediaError::MalformedInput(format!(
            "{} produced no output for {}",
            output.binary,
            path.display()
        )));
    }
    serde_json::from_str(text)
        .map_err(|e| MediaError::MalformedInput(format!("{} JSON: {}", output.binary, e)))
}

/// Condense a probe document into `FFProbe:*` keys.
pub fn summarize(data: &Value) -> AnalysisResult {
    let mut result = AnalysisResult::new();
    if let Some(format) = data.get("format") {
        result.insert("FFProbe:Format", format.get("format_name").cloned());
        result.insert_opt(
            "FFProbe:Duration",
            format.get("duration").and_then(as_f64).map(Value::from),
        );
        result.insert_opt(
            "FFProbe:NumStreams",
            format.get("nb_streams").and_then(as_u64).map(Value::from),
        );
    }

    let streams: Vec<Value> = data
        .get("streams")
        .and_then(Value::as_array)
        .map(|streams| streams.iter().map(summarize_stream).collect())
        .unwrap_or_default();
    if !streams.is_empty() {
        result.insert("FFProbe:Streams", streams);
    }
    result
}

fn summarize_stream(stream: &Value) -> Value {
    let field = |key: &str| stream.get(key).filter(|v| !v.is_null());
    let text = |key: &str| {
        field(key)
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_else(|| "-".to_string())
    };

    let codec_type = field("codec_type").and_then(Value::as_str).unwrap_or("data");
    let codec_name = field("codec_name").and_then(Value::as_str).unwrap_or("unknown");

    let (rate, width, height) = match codec_type {
        "video" => (
            field("avg_frame_rate").cloned(),
            field("width").and_then(as_u64),
            field("height").and_then(as_u64),
        ),
        "audio" => {
            let sample_rate = field("sample_rate")
                .and_then(as_f64)
                .map(|r| (r as i64).to_string())
                .unwrap_or_else(|| "-".to_string());
            let rate = format!("{}/{}/{}", text("channels"), text("sample_fmt"), sample_rate);
            (Some(json!(rate)), None, None)
        }
        _ => (None, None, None),
    };

    record([
        ("Format", json!(format!("{}/{}", codec_type, codec_name))),
        ("Width", json!(width)),
        ("Height", json!(height)),
        ("Rate", rate.unwrap_or(Value::Null)),
        ("Duration", json!(field("duration").and_then(as_f64))),
    ])
}

/// ffprobe reports most numbers as strings; "N/A" means absent.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OGV_PROBE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "theora", "codec_type": "video",
             "width": 400, "height": 300, "avg_frame_rate": "25/1",
             "duration": "5.000000"},
            {"index": 1, "codec_name": "vorbis", "codec_type": "audio",
             "sample_fmt": "fltp", "sample_rate": "44100", "channels": 2,
             "duration": "N/A"},
            {"index": 2, "codec_type": "data"}
        ],
        "format": {"format_name": "ogg", "duration": "5.024000", "nb_streams": 3}
    }"#;

    #[test]
    fn test_summarize_format() {
        let data: Value = serde_json::from_str(OGV_PROBE).unwrap();
        let result = summarize(&data);
        assert_eq!(result.get("FFProbe:Format"), Some(&json!("ogg")));
        assert_eq!(result.get("FFProbe:Duration"), Some(&json!(5.024)));
        assert_eq!(result.get("FFProbe:NumStreams"), Some(&json!(3)));
    }

    #[test]
    fn test_summarize_streams() {
        let data: Value = serde_json::from_str(OGV_PROBE).unwrap();
        let result = summarize(&data);
        let streams = result.get("FFProbe:Streams").unwrap().as_array().unwrap();
        assert_eq!(streams.len(), 3);
        assert_eq!(
            streams[0],
            json!({"Format": "video/theora", "Width": 400, "Height": 300,
                   "Rate": "25/1", "Duration": 5.0})
        );
        assert_eq!(streams[1], json!({"Format": "audio/vorbis", "Rate": "2/fltp/44100"}));
        assert_eq!(streams[2], json!({"Format": "data/unknown"}));
    }

    #[test]
    fn test_summarize_empty_document() {
        assert!(summarize(&json!({})).is_empty());
    }

    #[test]
    fn test_missing_prober() {
        let binaries = vec!["no-such-ffprobe".to_string(), "no-such-avprobe".to_string()];
        let err = probe(&binaries, Path::new("/tmp/whatever.ogg")).unwrap_err();
        assert!(matches!(err, MediaError::ProbeUnavailable(_)));
    }
}
