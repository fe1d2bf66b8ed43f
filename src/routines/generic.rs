//! Routines available to every file

use super::exif_tags;
use crate::error::{MediaError, Result};
use crate::media_file::MediaFile;
use crate::result::AnalysisResult;
use std::time::SystemTime;

/// Size, timestamps and permissions from the filesystem.
pub fn analyze_os_stat(file: &mut MediaFile) -> Result<AnalysisResult> {
    let metadata = std::fs::metadata(file.path()).map_err(|e| MediaError::io(file.path(), e))?;

    let mut result = AnalysisResult::new();
    result.insert("File:FileSize", format_size(metadata.len()));
    result.insert_opt("File:FileModifyDate", metadata.modified().ok().map(format_time));
    result.insert_opt("File:FileAccessDate", metadata.accessed().ok().map(format_time));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        result.insert(
            "File:FilePermissions",
            format_permissions(metadata.permissions().mode()),
        );
    }
    Ok(result)
}

pub fn analyze_mimetype(file: &mut MediaFile) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new();
    result.insert("File:MIMEType", file.mime());
    Ok(result)
}

/// Every tag ExifTool (or the native EXIF reader) reports.
pub fn analyze_exifdata(file: &mut MediaFile) -> Result<AnalysisResult> {
    Ok(exif_tags(file)?.into_iter().collect())
}

/// Human readable size in ExifTool's style: "98 bytes", "12 kB", "3.4 MB".
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b < 2 * KB => format!("{} bytes", b),
        b if b < 2 * MB => format!("{} kB", (b + KB / 2) / KB),
        b if b < 2 * GB => format!("{:.1} MB", b as f64 / MB as f64),
        b => format!("{:.1} GB", b as f64 / GB as f64),
    }
}

fn format_time(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time).to_rfc3339()
}

/// `rwxr-xr-x` style permission string.
#[cfg(unix)]
fn format_permissions(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' })
        .collect()
}
