//! Routines for audio and video streams

use crate::cache::View;
use crate::error::Result;
use crate::media_file::MediaFile;
use crate::probe::ffprobe;
use crate::result::AnalysisResult;

/// Container format, duration and per-stream summary from ffprobe.
pub fn analyze_ffprobe(file: &mut MediaFile) -> Result<AnalysisResult> {
    Ok(match file.fetch("ffprobe")? {
        View::Json(data) => ffprobe::summarize(&data),
        _ => AnalysisResult::new(),
    })
}

/// Ogg audio and Ogg video share MIME types, so the detected container is
/// recorded explicitly.
pub fn analyze_ogg_format(_file: &mut MediaFile) -> Result<AnalysisResult> {
    Ok(file_format("ogg"))
}

pub fn analyze_ogv_format(_file: &mut MediaFile) -> Result<AnalysisResult> {
    Ok(file_format("ogv"))
}

fn file_format(format: &str) -> AnalysisResult {
    let mut result = AnalysisResult::new();
    result.insert("Composite:FileFormat", format);
    result
}
