//! Routines for documents

use super::{detect_softwares, exif_tags, SoftwareRule};
use crate::error::Result;
use crate::media_file::MediaFile;
use crate::result::AnalysisResult;
use serde_json::{json, Map, Value};

const PRODUCER_RULES: &[SoftwareRule] = &[
    ("libreoffice", "LibreOffice"),
    ("libre office", "LibreOffice"),
    ("dopdf", "doPDF"),
    ("acdsee", "ACDSee"),
    ("itext", "iText"),
];

/// Curated names of the software that produced a document, from the PDF
/// producer tag.
pub fn analyze_softwares(file: &mut MediaFile) -> Result<AnalysisResult> {
    let tags = exif_tags(file)?;
    Ok(softwares_from_tags(&tags))
}

fn softwares_from_tags(tags: &Map<String, Value>) -> AnalysisResult {
    let mut found = detect_softwares(tags, &["PDF:Producer"], PRODUCER_RULES);
    let impress = tags
        .get("PDF:Creator")
        .and_then(Value::as_str)
        .is_some_and(|creator| creator.eq_ignore_ascii_case("impress"));
    if impress && found.remove("LibreOffice") {
        found.insert("LibreOffice Impress");
    }

    let mut result = AnalysisResult::new();
    if !found.is_empty() {
        result.insert("Composite:Softwares", json!(found));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_libreoffice_impress() {
        let result = softwares_from_tags(&tags(json!({
            "PDF:Producer": "LibreOffice 5.1",
            "PDF:Creator": "Impress",
        })));
        assert_eq!(result.get("Composite:Softwares"), Some(&json!(["LibreOffice Impress"])));
    }

    #[test]
    fn test_known_producers() {
        for (producer, name) in [
            ("LibreOffice 6.0", "LibreOffice"),
            ("doPDF Ver 7.3 Build 398", "doPDF"),
            ("ACDSee Pro 8", "ACDSee"),
            ("iText 2.1.7 by 1T3XT", "iText"),
        ] {
            let result = softwares_from_tags(&tags(json!({ "PDF:Producer": producer })));
            assert_eq!(result.get("Composite:Softwares"), Some(&json!([name])), "{}", producer);
        }
    }

    #[test]
    fn test_unknown_producer() {
        assert!(softwares_from_tags(&tags(json!({"PDF:Producer": "Ghostscript"}))).is_empty());
        assert!(softwares_from_tags(&Map::new()).is_empty());
    }
}
