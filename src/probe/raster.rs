//! Conversion of vector and layered images to PNG
//!
//! The argument syntax depends on the tool, so each candidate is tried with
//! its own command line.

use super::ToolCommand;
use crate::error::{MediaError, Result};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rasterizer {
    Rsvg,
    Inkscape,
    ImageMagick,
}

impl Rasterizer {
    fn for_binary(binary: &str) -> Self {
        let name = Path::new(binary)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.starts_with("rsvg-convert") {
            Rasterizer::Rsvg
        } else if name.starts_with("inkscape") {
            Rasterizer::Inkscape
        } else {
            Rasterizer::ImageMagick
        }
    }

    fn command(self, binary: &str, density: u64, src: &Path, dest: &Path) -> ToolCommand {
        let density = density.to_string();
        let cmd = ToolCommand::new([binary]);
        match self {
            Rasterizer::Rsvg => cmd
                .args(["-d", &density, "-p", &density, "-f", "png", "-o"])
                .path(dest)
                .path(src),
            Rasterizer::Inkscape => {
                let mut export = std::ffi::OsString::from("--export-filename=");
                export.push(dest);
                cmd.arg("--export-type=png")
                    .arg(export)
                    .arg(format!("--export-dpi={}", density))
                    .path(src)
            }
            Rasterizer::ImageMagick => cmd
                .args(["-density", &density])
                .path(src)
                .arg("-flatten")
                .path(dest),
        }
    }
}

/// Render `src` into the PNG file `dest` with the first installed tool.
pub fn rasterize(binaries: &[String], density: u64, src: &Path, dest: &Path) -> Result<()> {
    for binary in binaries {
        let cmd = Rasterizer::for_binary(binary).command(binary, density, src, dest);
        match cmd.execute() {
            Ok(output) => {
                debug!("Rasterized {} with {}", src.display(), output.binary);
                return ensure_written(dest);
            }
            Err(MediaError::ProbeUnavailable(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(MediaError::ProbeUnavailable(format!(
        "no rasterizer among [{}] is installed",
        binaries.join(", ")
    )))
}

/// Convert the first frame of `src` to an 8-bit sRGB PNG. Used for CMYK
/// JPEG and TIFF files that barcode readers cannot handle.
pub fn convert_to_srgb(binaries: &[String], src: &Path, dest: &Path) -> Result<()> {
    let mut first_frame = src.as_os_str().to_os_string();
    first_frame.push("[0]");

    let magick: Vec<String> = binaries
        .iter()
        .filter(|b| Rasterizer::for_binary(b) == Rasterizer::ImageMagick)
        .cloned()
        .collect();
    ToolCommand::new(magick)
        .arg(first_frame)
        .args(["-colorspace", "sRGB", "-type", "TrueColor"])
        .path(dest)
        .execute()?;
    ensure_written(dest)
}

fn ensure_written(dest: &Path) -> Result<()> {
    let len = std::fs::metadata(dest)?.len();
    if len == 0 {
        return Err(MediaError::MalformedInput(format!(
            "converter produced an empty file at {}",
            dest.display()
        )));
    }
    Ok(())
}
