//! Barcode readers: zxing-cpp's `ZXingReader` and `zbarimg`

use super::ToolCommand;
use crate::error::Result;
use serde_json::{json, Value};
use std::path::Path;

/// Symbology names printed by zbarimg in front of each result.
const ZBAR_SYMBOLOGIES: &[&str] = &[
    "EAN-2",
    "EAN-5",
    "EAN-8",
    "UPC-E",
    "ISBN-10",
    "UPC-A",
    "EAN-13",
    "ISBN-13",
    "COMPOSITE",
    "I2/5",
    "DataBar",
    "DataBar-Exp",
    "Codabar",
    "CODE-39",
    "CODE-93",
    "CODE-128",
    "PDF417",
    "QR-Code",
    "SQ-Code",
];

/// Decode barcodes with zxing-cpp. Returns `{format, data}` records.
pub fn zxing(binaries: &[String], path: &Path) -> Result<Vec<Value>> {
    // ZXingReader exits non-zero when a symbol is found but fails to decode
    let output = ToolCommand::new(binaries.iter().cloned())
        .path(path)
        .ok_codes(&[0, 1])
        .execute()?;
    Ok(parse_zxing(&output.stdout_text()))
}

/// Decode barcodes with zbar. Returns `{format, data}` records.
pub fn zbar(binaries: &[String], path: &Path) -> Result<Vec<Value>> {
    // Exit status 4 means "no symbols found"
    let output = ToolCommand::new(binaries.iter().cloned())
        .arg("--quiet")
        .path(path)
        .ok_codes(&[0, 4])
        .execute()?;
    Ok(parse_zbar(&output.stdout_text()))
}

/// Parse `Key: value` blocks separated by blank lines.
pub fn parse_zxing(text: &str) -> Vec<Value> {
    let mut barcodes = Vec::new();
    for block in text.split("\n\n") {
        let mut format = None;
        let mut data = None;
        let mut failed = false;
        for line in block.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Format" => format = Some(value.to_string()),
                "Text" => data = Some(unquote(value).to_string()),
                "Error" => failed = true,
                _ => {}
            }
        }
        match (format, data) {
            (Some(format), Some(data)) if !failed && format != "None" => {
                barcodes.push(json!({"format": normalize_format(&format), "data": data}));
            }
            _ => {}
        }
    }
    barcodes
}

/// Parse `TYPE:data` lines. Data may span several lines.
pub fn parse_zbar(text: &str) -> Vec<Value> {
    let mut barcodes: Vec<(String, String)> = Vec::new();
    for line in text.lines() {
        let symbology = line
            .split_once(':')
            .filter(|(kind, _)| ZBAR_SYMBOLOGIES.contains(kind));
        match symbology {
            Some((kind, data)) => barcodes.push((kind.to_string(), data.to_string())),
            None => {
                if let Some((_, data)) = barcodes.last_mut() {
                    data.push('\n');
                    data.push_str(line);
                }
            }
        }
    }
    barcodes
        .into_iter()
        .map(|(kind, data)| json!({"format": normalize_format(&kind), "data": data}))
        .collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// `QRCode` -> `QR_CODE`, `Code128` -> `CODE_128`, `EAN-13` -> `EAN_13`.
pub fn normalize_format(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '/' {
            out.push('_');
            continue;
        }
        if i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let word_start = c.is_uppercase()
                && (prev.is_lowercase()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
            let number_start = c.is_ascii_digit() && prev.is_alphabetic();
            if word_start || number_start {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }
    out
}
