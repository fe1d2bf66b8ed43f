//! Pixel buffers
//!
//! Layout of a [`PixelBuffer`] by dimensionality:
//! - 2-D `(height, width)`: single channel (grayscale)
//! - 3-D `(height, width, channels)`: one frame, channel axis last
//! - 4-D `(frames, height, width, channels)`: animated sequence

use crate::error::{MediaError, Result};
use image::{AnimationDecoder, DynamicImage, ImageDecoder, ImageError, ImageReader, Limits};
use ndarray::{ArrayD, Axis, IxDyn};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

pub type PixelBuffer = ArrayD<u8>;

/// Animated container formats decoded frame by frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animated {
    Gif,
    Png,
}

/// Decode a single raster image, refusing anything larger than `max_pixels`.
pub fn decode_image(path: &Path, max_pixels: u64) -> Result<PixelBuffer> {
    let (width, height) = open_reader(path)?
        .into_dimensions()
        .map_err(|e| map_image_error(e, 0, max_pixels))?;
    let pixels = width as u64 * height as u64;
    check_ceiling(pixels, max_pixels)?;

    let mut reader = open_reader(path)?;
    reader.limits(decoder_limits(max_pixels));
    let img = reader
        .decode()
        .map_err(|e| map_image_error(e, pixels, max_pixels))?;
    from_dynamic(img)
}

/// Decode every frame of an animation. A single-frame file yields a 3-D
/// buffer, anything longer a 4-D one.
pub fn decode_animation(path: &Path, format: Animated, max_pixels: u64) -> Result<PixelBuffer> {
    let reader = BufReader::new(File::open(path)?);
    let frames = match format {
        Animated::Gif => {
            let mut decoder = image::codecs::gif::GifDecoder::new(reader)
                .map_err(|e| map_image_error(e, 0, max_pixels))?;
            // Frames are composed on a full logical-screen canvas
            let canvas = check_canvas(&mut decoder, max_pixels)?;
            debug!("GIF canvas of {} pixels in {}", canvas, path.display());
            decoder.into_frames()
        }
        Animated::Png => {
            let mut decoder = image::codecs::png::PngDecoder::new(reader)
                .map_err(|e| map_image_error(e, 0, max_pixels))?;
            let is_apng = decoder
                .is_apng()
                .map_err(|e| map_image_error(e, 0, max_pixels))?;
            if !is_apng {
                return decode_image(path, max_pixels);
            }
            check_canvas(&mut decoder, max_pixels)?;
            decoder
                .apng()
                .map_err(|e| map_image_error(e, 0, max_pixels))?
                .into_frames()
        }
    };

    let mut buffers = Vec::new();
    let mut total: u64 = 0;
    for frame in frames {
        let frame = frame.map_err(|e| map_image_error(e, total, max_pixels))?;
        let buffer = frame.into_buffer();
        total += buffer.width() as u64 * buffer.height() as u64;
        check_ceiling(total, max_pixels)?;
        buffers.push(buffer);
    }

    let first = buffers
        .first()
        .ok_or_else(|| MediaError::MalformedInput("animation has no frames".to_string()))?;
    let (width, height) = (first.width() as usize, first.height() as usize);
    if buffers.len() == 1 {
        return from_dynamic(DynamicImage::ImageRgba8(buffers.remove(0)));
    }
    if buffers
        .iter()
        .any(|b| b.width() as usize != width || b.height() as usize != height)
    {
        return Err(MediaError::MalformedInput(
            "animation frames differ in size".to_string(),
        ));
    }

    debug!("Decoded {} frames of {}x{} from {}", buffers.len(), width, height, path.display());
    let count = buffers.len();
    let mut raw = Vec::with_capacity(count * width * height * 4);
    for buffer in buffers {
        raw.extend_from_slice(buffer.as_raw());
    }
    ArrayD::from_shape_vec(IxDyn(&[count, height, width, 4]), raw)
        .map_err(|e| MediaError::MalformedInput(e.to_string()))
}

/// Convert a decoded image to the canonical layout, keeping its channel
/// count. 16-bit and float images are reduced to 8 bits.
pub fn from_dynamic(img: DynamicImage) -> Result<PixelBuffer> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (channels, raw) = match img {
        DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
        other => {
            let color = other.color();
            match (color.has_color(), color.has_alpha()) {
                (true, true) => (4, other.to_rgba8().into_raw()),
                (true, false) => (3, other.to_rgb8().into_raw()),
                (false, true) => (2, other.to_luma_alpha8().into_raw()),
                (false, false) => (1, other.to_luma8().into_raw()),
            }
        }
    };

    let shape = if channels == 1 {
        IxDyn(&[height, width])
    } else {
        IxDyn(&[height, width, channels])
    };
    ArrayD::from_shape_vec(shape, raw).map_err(|e| MediaError::MalformedInput(e.to_string()))
}

/// Single-channel luminance of a buffer (ITU-R 601 weights). Animations use
/// their first frame. Returns `None` for unsupported layouts.
pub fn to_grey(px: &PixelBuffer) -> Option<PixelBuffer> {
    match px.ndim() {
        2 => Some(px.clone()),
        3 => {
            let channels = px.shape()[2];
            match channels {
                1 | 2 => Some(px.index_axis(Axis(2), 0).to_owned()),
                3 | 4 => {
                    let r = px.index_axis(Axis(2), 0);
                    let g = px.index_axis(Axis(2), 1);
                    let b = px.index_axis(Axis(2), 2);
                    let mut grey = r.mapv(|v| v as u32 * 299);
                    grey.zip_mut_with(&g, |acc, &v| *acc += v as u32 * 587);
                    grey.zip_mut_with(&b, |acc, &v| *acc += v as u32 * 114);
                    Some(grey.mapv(|v| ((v + 500) / 1000) as u8))
                }
                _ => None,
            }
        }
        4 => to_grey(&px.index_axis(Axis(0), 0).to_owned()),
        _ => None,
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

fn decoder_limits(max_pixels: u64) -> Limits {
    let mut limits = Limits::default();
    // Eight bytes per pixel covers 16-bit RGBA. The floor leaves room for
    // decoder scratch buffers on tiny images.
    limits.max_alloc = Some(max_pixels.saturating_mul(8).max(64 * 1024 * 1024));
    limits
}

/// Reject a canvas declared larger than the ceiling, then cap the decoder's
/// own allocations. Returns the canvas size in pixels.
fn check_canvas(decoder: &mut impl ImageDecoder, max_pixels: u64) -> Result<u64> {
    let (width, height) = decoder.dimensions();
    let pixels = width as u64 * height as u64;
    check_ceiling(pixels, max_pixels)?;
    decoder
        .set_limits(decoder_limits(max_pixels))
        .map_err(|e| map_image_error(e, pixels, max_pixels))?;
    Ok(pixels)
}

fn check_ceiling(pixels: u64, limit: u64) -> Result<()> {
    if pixels > limit {
        return Err(MediaError::ResourceExhausted { pixels, limit });
    }
    Ok(())
}

fn map_image_error(e: ImageError, pixels: u64, limit: u64) -> MediaError {
    match e {
        ImageError::Limits(_) => MediaError::ResourceExhausted { pixels, limit },
        ImageError::IoError(io) => MediaError::Tool(io),
        other => MediaError::MalformedInput(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, Rgba};

    #[test]
    fn test_decode_rgb_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbImage::from_pixel(5, 3, Rgb([255, 0, 0])).save(&path).unwrap();

        let px = decode_image(&path, 1_000).unwrap();
        assert_eq!(px.shape(), &[3, 5, 3]);
        assert!(px.index_axis(Axis(2), 0).iter().all(|&v| v == 255));
    }

    #[test]
    fn test_decode_grey_png_is_2d() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grey.png");
        image::GrayImage::from_pixel(4, 6, Luma([7])).save(&path).unwrap();

        let px = decode_image(&path, 1_000).unwrap();
        assert_eq!(px.shape(), &[6, 4]);
    }

    #[test]
    fn test_decode_respects_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        image::RgbaImage::from_pixel(20, 20, Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let err = decode_image(&path, 399).unwrap_err();
        assert!(matches!(err, MediaError::ResourceExhausted { pixels: 400, limit: 399 }));
        assert!(decode_image(&path, 400).is_ok());
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nthis is not a png").unwrap();
        let err = decode_image(&path, 1_000).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_static_gif_is_3d() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static.gif");
        image::RgbaImage::from_pixel(3, 2, Rgba([0, 0, 255, 255])).save(&path).unwrap();

        let px = decode_animation(&path, Animated::Gif, 1_000).unwrap();
        assert_eq!(px.shape(), &[2, 3, 4]);
    }

    #[test]
    fn test_oversized_gif_canvas_rejected_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bomb.gif");
        // 20000x20000 logical screen holding a single 1x1 frame
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[0x20, 0x4E, 0x20, 0x4E, 0x80, 0, 0]);
        gif.extend_from_slice(&[0, 0, 0, 0xFF, 0xFF, 0xFF]);
        gif.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0]);
        gif.extend_from_slice(&[0x02, 0x02, 0x44, 0x01, 0x00, 0x3B]);
        std::fs::write(&path, &gif).unwrap();

        let err = decode_animation(&path, Animated::Gif, 89_478_485).unwrap_err();
        assert!(matches!(
            err,
            MediaError::ResourceExhausted { pixels: 400_000_000, limit: 89_478_485 }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_to_grey() {
        let rgb = ArrayD::from_shape_vec(IxDyn(&[1, 2, 3]), vec![255, 255, 255, 0, 0, 0]).unwrap();
        let grey = to_grey(&rgb).unwrap();
        assert_eq!(grey.shape(), &[1, 2]);
        assert_eq!(grey.iter().copied().collect::<Vec<_>>(), vec![255, 0]);

        let animated = ArrayD::<u8>::zeros(IxDyn(&[3, 2, 2, 4]));
        assert_eq!(to_grey(&animated).unwrap().shape(), &[2, 2]);

        let flat = ArrayD::<u8>::zeros(IxDyn(&[10]));
        assert!(to_grey(&flat).is_none());
    }
}
