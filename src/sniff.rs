//! Content sniffing
//!
//! The first pass produces a MIME type from file content: `tree_magic_mini`
//! first, `infer` when that only reports a generic type, and the extension
//! as a last resort. An extension guess only selects a top-level category.
//! Format checks below look at magic bytes or content and require the full
//! signature, so a truncated file never matches a specific format.

use crate::error::{MediaError, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bytes read from the start of the file for sniffing.
pub const HEADER_LEN: usize = 8192;

const GENERIC_MIMES: &[&str] = &["application/octet-stream", "text/plain", "all/allfiles"];

/// Result of the first sniffing pass over a file.
#[derive(Debug, Clone)]
pub struct Sniffed {
    pub path: PathBuf,
    pub mime: String,
    /// The MIME type was guessed from the file name, not the content.
    pub from_extension: bool,
    pub header: Vec<u8>,
    pub file_size: u64,
}

impl Sniffed {
    /// Top-level media type, e.g. `image` for `image/png`.
    pub fn media_type(&self) -> &str {
        self.mime.split('/').next().unwrap_or("")
    }
}

/// Read the header of `path` and detect its MIME type.
///
/// Fails with an I/O error when the path is missing, not a regular file or
/// not readable.
pub fn sniff(path: &Path) -> Result<Sniffed> {
    let metadata = std::fs::metadata(path).map_err(|e| MediaError::io(path, e))?;
    if !metadata.is_file() {
        return Err(MediaError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let file = File::open(path).map_err(|e| MediaError::io(path, e))?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| MediaError::io(path, e))?;

    let (mime, from_extension) = detect_mime(path, &header);
    debug!("Sniffed {} as {}", path.display(), mime);

    Ok(Sniffed {
        path: path.to_path_buf(),
        mime,
        from_extension,
        header,
        file_size: metadata.len(),
    })
}

/// MIME type of the content, and whether it was guessed from the extension.
fn detect_mime(path: &Path, header: &[u8]) -> (String, bool) {
    if header.is_empty() {
        return ("application/x-empty".to_string(), false);
    }

    let magic = tree_magic_mini::from_u8(header);
    if !GENERIC_MIMES.contains(&magic) {
        return (magic.to_string(), false);
    }

    if let Some(kind) = infer::get(header) {
        debug!("tree_magic reported {}, infer found {}", magic, kind.mime_type());
        return (kind.mime_type().to_string(), false);
    }

    // Textual content is a real answer; only binary blobs fall back further.
    if magic == "text/plain" {
        return (magic.to_string(), false);
    }

    let guessed = detect_mime_from_extension(path);
    if guessed == "application/octet-stream" {
        return (guessed, false);
    }
    debug!("No content match for {}, extension suggests {}", path.display(), guessed);
    (guessed, true)
}

/// Detect MIME type from file extension
pub fn detect_mime_from_extension(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        // Images
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tiff" | "tif" => "image/tiff",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "xcf" => "image/x-xcf",
        "ico" => "image/x-icon",
        // Video
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "ogv" => "video/ogg",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "mid" | "midi" => "audio/midi",
        // Documents
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        // Default
        _ => "application/octet-stream",
    }
    .to_string()
}

// ============================================================================
// Format checks
// ============================================================================

pub fn is_jpeg(header: &[u8]) -> bool {
    header.len() >= 4 && header.starts_with(&[0xFF, 0xD8, 0xFF])
}

pub fn is_png(header: &[u8]) -> bool {
    header.starts_with(b"\x89PNG\r\n\x1a\n")
}

pub fn is_gif(header: &[u8]) -> bool {
    header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a")
}

pub fn is_tiff(header: &[u8]) -> bool {
    header.len() >= 8 && (header.starts_with(b"II*\0") || header.starts_with(b"MM\0*"))
}

pub fn is_xcf(header: &[u8]) -> bool {
    header.len() >= 14 && header.starts_with(b"gimp xcf ")
}

pub fn is_pdf(header: &[u8]) -> bool {
    header.len() >= 8 && header.starts_with(b"%PDF-")
}

pub fn is_ogg(header: &[u8]) -> bool {
    // A complete page header is 27 bytes.
    header.len() >= 27 && header.starts_with(b"OggS")
}

/// Whether an Ogg stream's header pages declare a video stream.
pub fn has_ogg_video(header: &[u8]) -> bool {
    is_ogg(header)
        && (contains(header, b"\x80theora") || contains(header, b"\x01video\0\0\0"))
}

pub fn is_raster_image(header: &[u8]) -> bool {
    is_jpeg(header) || is_png(header) || is_gif(header) || is_tiff(header)
}

/// Whether the content is an SVG document, whatever MIME type it was
/// detected as (`image/svg+xml`, `application/xml`, `text/plain`,
/// `text/html` are all seen in the wild). The content must hold an `<svg`
/// element in every case.
pub fn is_svg(sniffed: &Sniffed) -> bool {
    let textual = sniffed.mime.starts_with("text/")
        || sniffed.mime.ends_with("xml")
        || sniffed.mime.ends_with("+xml");
    if !textual || contains(&sniffed.header, &[0]) {
        return false;
    }
    let text = String::from_utf8_lossy(&sniffed.header).to_lowercase();
    text.contains("<svg") && (text.contains("xmlns") || text.trim_start().starts_with("<"))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
