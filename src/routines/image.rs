//! Routines for raster and vector images

use super::color_names::{ColorTable, Rgb};
use super::{detect_softwares, exif_tags, SoftwareRule};
use crate::cache::View;
use crate::config;
use crate::error::Result;
use crate::media_file::MediaFile;
use crate::pixels::PixelBuffer;
use crate::probe::{barcode, faces};
use crate::result::AnalysisResult;
use ndarray::Axis;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SOFTWARE_KEYS: &[&str] = &["EXIF:Software", "PNG:Software", "XMP:CreatorTool"];

const SOFTWARE_RULES: &[SoftwareRule] = &[
    ("adobe photoshop", "Adobe Photoshop"),
    ("gimp", "GIMP"),
    ("inkscape", "Inkscape"),
    ("paint.net", "Paint.NET"),
    ("picasa", "Picasa"),
    ("acdsee", "ACDSee"),
];

/// Mean colour with the closest labelled colour from the colour-name table.
pub fn analyze_color_average(file: &mut MediaFile) -> Result<AnalysisResult> {
    let Some(px) = file.fetch("ndarray")?.as_pixels().cloned() else {
        return Ok(AnalysisResult::new());
    };
    let mut result = color_average(&px);

    let Some(average) = result.get("Color:AverageRGB").and_then(as_rgb) else {
        return Ok(result);
    };
    let Some(table) = color_table(file)? else {
        return Ok(result);
    };
    if let Some((name, rgb)) = table.closest(average) {
        result.insert("Color:ClosestLabeledColor", name);
        result.insert("Color:ClosestLabeledColorRGB", rgb.to_vec());
    }
    Ok(result)
}

/// Mean colour of a buffer. Grayscale buffers report `Color:AverageGrey`,
/// colour buffers `Color:AverageRGB`; animations are averaged over all
/// frames. Other layouts give an empty result.
pub fn color_average(px: &PixelBuffer) -> AnalysisResult {
    let mut result = AnalysisResult::new();
    match px.ndim() {
        2 => result.insert("Color:AverageGrey", round(mean(px.iter()))),
        3 | 4 => {
            let channel_axis = Axis(px.ndim() - 1);
            let channels = px.len_of(channel_axis);
            if channels >= 3 {
                let rgb: Vec<u64> = (0..3)
                    .map(|c| round(mean(px.index_axis(channel_axis, c).iter())))
                    .collect();
                result.insert("Color:AverageRGB", rgb);
            } else if channels >= 1 {
                let grey = px.index_axis(channel_axis, 0);
                result.insert("Color:AverageGrey", round(mean(grey.iter())));
            }
        }
        other => debug!("No colour average for a {}-D buffer", other),
    }
    result
}

/// The configured colour-name table. `None` when a custom table cannot be
/// loaded; the labelled colour is then left out.
fn color_table(file: &MediaFile) -> Result<Option<Cow<'static, ColorTable>>> {
    let source = file.config().get_str(config::COLOR_NAMES_FILE)?;
    if source.is_empty() {
        return Ok(Some(Cow::Borrowed(ColorTable::bundled())));
    }
    match ColorTable::from_json_file(Path::new(source)) {
        Ok(table) => Ok(Some(Cow::Owned(table))),
        Err(e) if e.is_recoverable() => {
            warn!("Colour names unavailable from {}: {}", source, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn as_rgb(value: &Value) -> Option<Rgb> {
    match value.as_array()?.as_slice() {
        [r, g, b] => Some([
            u8::try_from(r.as_u64()?).ok()?,
            u8::try_from(g.as_u64()?).ok()?,
            u8::try_from(b.as_u64()?).ok()?,
        ]),
        _ => None,
    }
}

/// Alpha usage, number of grey shades and how far the colours are from
/// grey.
pub fn analyze_color_info(file: &mut MediaFile) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new();
    let Some(px) = file.fetch("ndarray")?.as_pixels().cloned() else {
        return Ok(result);
    };

    let frame = match px.ndim() {
        4 => px.index_axis(Axis(0), 0).to_owned(),
        _ => (*px).clone(),
    };
    result.insert("Color:UsesAlpha", uses_alpha(&frame));

    if let Some(grey) = file.fetch("ndarray_grey")?.as_pixels() {
        let shades: BTreeSet<u8> = grey.iter().copied().collect();
        result.insert("Color:NumberOfGreyShades", shades.len());
        if frame.ndim() == 3 && frame.shape()[2] >= 3 {
            result.insert_opt(
                "Color:MeanSquareErrorFromGrey",
                serde_json::Number::from_f64(mse_from_grey(&frame, grey)),
            );
        }
    }
    Ok(result)
}

/// Faces with their bounding box and, where the detector reports them,
/// score and landmark points.
pub fn analyze_facial_landmarks(file: &mut MediaFile) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new();
    let Some(path) = path_view(file, "filename_raster")? else {
        return Ok(result);
    };
    let binaries = file.config().get_str_list(config::FACEDETECT_BINARIES)?;
    let faces = faces::detect(&binaries, &path)?;
    if !faces.is_empty() {
        result.insert("dlib:Faces", faces);
    }
    Ok(result)
}

pub fn analyze_barcode_zxing(file: &mut MediaFile) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new();
    let Some(path) = path_view(file, "filename_zxing")? else {
        return Ok(result);
    };
    let binaries = file.config().get_str_list(config::ZXING_BINARIES)?;
    let barcodes = barcode::zxing(&binaries, &path)?;
    if !barcodes.is_empty() {
        result.insert("zxing:Barcodes", barcodes);
    }
    Ok(result)
}

pub fn analyze_barcode_zbar(file: &mut MediaFile) -> Result<AnalysisResult> {
    let mut result = AnalysisResult::new();
    let Some(path) = path_view(file, "filename_raster")? else {
        return Ok(result);
    };
    let binaries = file.config().get_str_list(config::ZBAR_BINARIES)?;
    let barcodes = barcode::zbar(&binaries, &path)?;
    if !barcodes.is_empty() {
        result.insert("zbar:Barcodes", barcodes);
    }
    Ok(result)
}

/// Editors named in the image's software tags.
pub fn analyze_softwares(file: &mut MediaFile) -> Result<AnalysisResult> {
    let tags = exif_tags(file)?;
    let found = detect_softwares(&tags, SOFTWARE_KEYS, SOFTWARE_RULES);
    let mut result = AnalysisResult::new();
    if !found.is_empty() {
        result.insert("Composite:Softwares", json!(found));
    }
    Ok(result)
}

fn path_view(file: &mut MediaFile, name: &str) -> Result<Option<PathBuf>> {
    Ok(match file.fetch(name)? {
        View::Path(path) => Some(path),
        other => {
            debug!(
                "{} unavailable for {}: {:?}",
                name,
                file.path().display(),
                other.unavailable_reason()
            );
            None
        }
    })
}

fn mean<'a>(values: impl Iterator<Item = &'a u8>) -> f64 {
    let (sum, count) = values.fold((0u64, 0u64), |(s, n), &v| (s + v as u64, n + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn round(value: f64) -> u64 {
    value.round() as u64
}

/// Any pixel not fully opaque. Buffers without an alpha channel never use it.
fn uses_alpha(frame: &PixelBuffer) -> bool {
    if frame.ndim() != 3 {
        return false;
    }
    let channels = frame.shape()[2];
    if channels != 2 && channels != 4 {
        return false;
    }
    frame
        .index_axis(Axis(2), channels - 1)
        .iter()
        .any(|&a| a < 255)
}

/// Mean over pixels and RGB channels of the squared distance to the
/// pixel's luminance.
fn mse_from_grey(frame: &PixelBuffer, grey: &PixelBuffer) -> f64 {
    let mut total = 0.0;
    let mut count = 0u64;
    for c in 0..3 {
        let channel = frame.index_axis(Axis(2), c);
        for (&v, &g) in channel.iter().zip(grey.iter()) {
            let d = v as f64 - g as f64;
            total += d * d;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
