//! Face detection through the `facedetect` script
//!
//! Each output line describes one face as `x y w h`, optionally followed by
//! a detection score and `name=x,y` landmark points.

use super::ToolCommand;
use crate::error::Result;
use serde_json::{json, Map, Value};
use std::path::Path;

pub fn detect(binaries: &[String], path: &Path) -> Result<Vec<Value>> {
    // facedetect exits with 2 when no face was found
    let output = ToolCommand::new(binaries.iter().cloned())
        .path(path)
        .ok_codes(&[0, 2])
        .execute()?;
    Ok(parse_faces(&output.stdout_text()))
}

/// Face records `{position: {left, top, width, height}, score?, <landmark>: [x, y]}`.
/// Lines that do not start with a box are skipped.
pub fn parse_faces(text: &str) -> Vec<Value> {
    text.lines().filter_map(parse_face).collect()
}

fn parse_face(line: &str) -> Option<Value> {
    let mut tokens = line.split_whitespace();
    let mut bbox = [0u64; 4];
    for slot in &mut bbox {
        *slot = tokens.next()?.parse().ok()?;
    }
    let [left, top, width, height] = bbox;

    let mut face = Map::new();
    face.insert(
        "position".to_string(),
        json!({"left": left, "top": top, "width": width, "height": height}),
    );
    for token in tokens {
        match token.split_once('=') {
            Some((name, point)) => {
                let (x, y) = point.split_once(',')?;
                let point = [x.parse::<i64>().ok()?, y.parse::<i64>().ok()?];
                face.insert(name.to_string(), json!(point));
            }
            None => {
                let score: f64 = token.parse().ok()?;
                face.insert("score".to_string(), json!(score));
            }
        }
    }
    Some(Value::Object(face))
}
