//! Derived view rules
//!
//! | view | kinds | value |
//! |---|---|---|
//! | `ndarray` | Image (Gif/Png animated, Svg/Xcf via raster) | [`View::Pixels`] |
//! | `ndarray_grey` | Image | 2-D [`View::Pixels`] |
//! | `filename_raster` | Image, Svg, Xcf | [`View::Path`] |
//! | `filename_zxing` | Image, Jpeg, Tiff | [`View::Path`] |
//! | `filename_uri` | Generic | [`View::Text`] |
//! | `ffprobe` | Generic | [`View::Json`] |
//! | `exiftool` | Generic | [`View::Json`] |
//!
//! Rules are looked up along the kind's lineage, most derived first.

use crate::cache::{View, ViewParams};
use crate::config;
use crate::error::{MediaError, Result};
use crate::handler::HandlerKind;
use crate::media_file::MediaFile;
use crate::pixels::{self, Animated};
use crate::probe::{self, exiftool, ffprobe, raster};
use std::path::PathBuf;
use std::sync::Arc;

/// Compute view `name` for `file`. `Ok(None)` means no kind in the lineage
/// defines the view.
pub fn compute(file: &mut MediaFile, name: &str, params: &ViewParams) -> Result<Option<View>> {
    for kind in file.kind().lineage() {
        if let Some(view) = compute_for(kind, file, name, params)? {
            return Ok(Some(view));
        }
    }
    Ok(None)
}

fn compute_for(
    kind: HandlerKind,
    file: &mut MediaFile,
    name: &str,
    params: &ViewParams,
) -> Result<Option<View>> {
    use HandlerKind::*;

    let view = match (kind, name) {
        (Svg | Xcf, "ndarray") => match fetch_path(file, "filename_raster")? {
            Ok(raster) => decode(file, |max| pixels::decode_image(&raster, max))?,
            Err(reason) => View::Unavailable(reason),
        },
        (Gif, "ndarray") => {
            let path = file.path().to_path_buf();
            decode(file, |max| pixels::decode_animation(&path, Animated::Gif, max))?
        }
        (Png, "ndarray") => {
            let path = file.path().to_path_buf();
            decode(file, |max| pixels::decode_animation(&path, Animated::Png, max))?
        }
        (Image, "ndarray") => {
            let path = file.path().to_path_buf();
            decode(file, |max| pixels::decode_image(&path, max))?
        }
        (Image, "ndarray_grey") => {
            let view = file.fetch("ndarray")?;
            match view.as_pixels() {
                Some(px) => match pixels::to_grey(px) {
                    Some(grey) => View::Pixels(Arc::new(grey)),
                    None => View::Unavailable(format!(
                        "cannot reduce a {}-D buffer to grey",
                        px.ndim()
                    )),
                },
                None => view,
            }
        }

        (Svg | Xcf, "filename_raster") => {
            let binaries = file.config().get_str_list(config::RASTERIZER_BINARIES)?;
            let density = match params.get("density") {
                Some(d) => d.parse().map_err(|_| MediaError::TypeMismatch {
                    key: "density".to_string(),
                    expected: "unsigned integer",
                })?,
                None => file.config().get_u64(config::RASTER_DENSITY)?,
            };
            let src = file.path().to_path_buf();
            let dest = file.temp_mut().create(".png")?;
            raster::rasterize(&binaries, density, &src, &dest)?;
            View::Path(dest)
        }
        (Image, "filename_raster") => View::Path(file.path().to_path_buf()),

        (Jpeg | Tiff, "filename_zxing") => {
            let binaries = file.config().get_str_list(config::RASTERIZER_BINARIES)?;
            let src = file.path().to_path_buf();
            let dest = file.temp_mut().create(".png")?;
            match raster::convert_to_srgb(&binaries, &src, &dest) {
                Ok(()) => View::Path(dest),
                // Readers cope with most RGB files as they are
                Err(MediaError::ProbeUnavailable(_)) => View::Path(src),
                Err(e) => return Err(e),
            }
        }
        (Image, "filename_zxing") => file.fetch("filename_raster")?,

        (Generic, "filename_uri") => {
            let absolute = probe::absolute(file.path())?;
            let uri = url::Url::from_file_path(&absolute).map_err(|()| {
                MediaError::MalformedInput(format!("cannot build a URI for {}", absolute.display()))
            })?;
            View::Text(uri.to_string())
        }
        (Generic, "ffprobe") => {
            let binaries = file.config().get_str_list(config::FFPROBE_BINARIES)?;
            View::Json(Arc::new(ffprobe::probe(&binaries, file.path())?))
        }
        (Generic, "exiftool") => {
            let binary = file.config().get_str(config::EXIFTOOL_BINARY)?.to_string();
            let fallback = file.config().get_bool(config::EXIF_NATIVE_FALLBACK)?;
            View::Json(Arc::new(exiftool::read_tags(&binary, fallback, file.path())?))
        }

        _ => return Ok(None),
    };
    Ok(Some(view))
}

/// Decode under the handle's pixel ceiling.
fn decode(
    file: &MediaFile,
    decoder: impl FnOnce(u64) -> Result<pixels::PixelBuffer>,
) -> Result<View> {
    let max_pixels = file.config().get_u64(config::MAX_DECODED_PIXELS)?;
    Ok(View::Pixels(Arc::new(decoder(max_pixels)?)))
}

/// Fetch a path-valued view; the error side carries the reason it is
/// unavailable.
fn fetch_path(file: &mut MediaFile, name: &str) -> Result<std::result::Result<PathBuf, String>> {
    let view = file.fetch(name)?;
    Ok(match view {
        View::Path(path) => Ok(path),
        View::Unavailable(reason) => Err(reason),
        other => Err(format!("{} is not a path: {:?}", name, other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::handler::{open_as, resolve, resolve_with};
    use image::{Rgb, Rgba};

    #[test]
    fn test_ndarray_of_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blue.png");
        image::RgbImage::from_pixel(4, 2, Rgb([0, 0, 255])).save(&path).unwrap();

        let mut file = resolve(&path).unwrap();
        assert_eq!(file.kind(), HandlerKind::Png);
        let view = file.fetch("ndarray").unwrap();
        assert_eq!(view.as_pixels().unwrap().shape(), &[2, 4, 3]);

        let grey = file.fetch("ndarray_grey").unwrap();
        assert_eq!(grey.as_pixels().unwrap().shape(), &[2, 4]);
    }

    #[test]
    fn test_ndarray_is_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255])).save(&path).unwrap();

        let mut file = resolve(&path).unwrap();
        let first = file.fetch("ndarray").unwrap();
        let second = file.fetch("ndarray").unwrap();
        assert!(Arc::ptr_eq(first.as_pixels().unwrap(), second.as_pixels().unwrap()));
    }

    #[test]
    fn test_pixel_ceiling_degrades_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        image::RgbImage::new(10, 10).save(&path).unwrap();

        let overrides = ConfigOverrides::new().set(config::MAX_DECODED_PIXELS, 99u64);
        let mut file = resolve_with(&path, &overrides).unwrap();
        let view = file.fetch("ndarray").unwrap();
        assert!(!view.is_available());
        assert!(!file.fetch("ndarray_grey").unwrap().is_available());
    }

    #[test]
    fn test_ndarray_not_defined_on_generic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        let mut file = resolve(&path).unwrap();
        assert!(compute(&mut file, "ndarray", &ViewParams::new()).unwrap().is_none());
    }

    #[test]
    fn test_filename_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my file.txt");
        std::fs::write(&path, "plain text").unwrap();
        let mut file = resolve(&path).unwrap();
        let view = file.fetch("filename_uri").unwrap();
        let uri = view.as_text().unwrap();
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("my%20file.txt"));
    }

    #[test]
    fn test_raster_image_is_its_own_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();
        let mut file = resolve(&path).unwrap();
        assert_eq!(file.fetch("filename_raster").unwrap().as_path(), Some(path.as_path()));
        assert_eq!(file.fetch("filename_zxing").unwrap().as_path(), Some(path.as_path()));
        assert_eq!(file.temp_artifacts().count(), 0);
    }

    #[test]
    fn test_svg_without_rasterizer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.svg");
        std::fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"></svg>"#,
        )
        .unwrap();
        let overrides =
            ConfigOverrides::new().set(config::RASTERIZER_BINARIES, vec!["no-such-rasterizer"]);
        let mut file = open_as(&path, HandlerKind::Svg, &overrides).unwrap();
        assert!(!file.fetch("filename_raster").unwrap().is_available());
        assert!(!file.fetch("ndarray").unwrap().is_available());
        // The destination was registered before the tool ran
        let temps: Vec<PathBuf> = file.temp_artifacts().map(PathBuf::from).collect();
        assert_eq!(temps.len(), 1);
        file.close();
        assert!(!temps[0].exists());
    }

    #[test]
    fn test_jpeg_zxing_falls_back_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        image::RgbImage::from_pixel(8, 8, Rgb([10, 200, 30])).save(&path).unwrap();
        let overrides =
            ConfigOverrides::new().set(config::RASTERIZER_BINARIES, vec!["no-such-convert"]);
        let mut file = resolve_with(&path, &overrides).unwrap();
        assert_eq!(file.kind(), HandlerKind::Jpeg);
        assert_eq!(file.fetch("filename_zxing").unwrap().as_path(), Some(path.as_path()));
    }

    #[test]
    fn test_exiftool_native_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbImage::new(2, 2).save(&path).unwrap();
        let overrides = ConfigOverrides::new().set(config::EXIFTOOL_BINARY, "no-such-exiftool");
        let mut file = resolve_with(&path, &overrides).unwrap();
        let view = file.fetch("exiftool").unwrap();
        assert!(view.as_json().unwrap().as_object().unwrap().is_empty());
    }

    #[test]
    fn test_ffprobe_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        let overrides = ConfigOverrides::new().set(config::FFPROBE_BINARIES, vec!["no-such-ffprobe"]);
        let mut file = resolve_with(&path, &overrides).unwrap();
        let view = file.fetch("ffprobe").unwrap();
        assert!(view.unavailable_reason().unwrap().contains("no-such-ffprobe"));
    }
}
