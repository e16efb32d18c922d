//! In-process raster codec built on the `image` crate.
//!
//! All functions take and return encoded bytes or local paths; callers handle
//! storage. Operations are CPU-bound and block the calling task, which matches
//! the sequential processing model of the pipeline.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use super::{Dimensions, RasterFormat};
use crate::error::Result;

/// Resize an encoded image, preserving aspect ratio.
pub fn resize_bytes(bytes: &[u8], size: Dimensions, format: RasterFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    encode(resize_image(img, size), format)
}

/// Resize an image read from a local path.
pub fn resize_file(path: &Path, size: Dimensions, format: RasterFormat) -> Result<Vec<u8>> {
    let img = image::open(path)?;
    encode(resize_image(img, size), format)
}

/// Rotate an image read from a local path by the given number of
/// counter-clockwise quarter turns.
pub fn rotate_file(path: &Path, quarter_turns: u32, format: RasterFormat) -> Result<Vec<u8>> {
    let img = image::open(path)?;
    let rotated = match quarter_turns % 4 {
        // image's rotate90 is clockwise; a 90-degree CCW turn is rotate270
        1 => img.rotate270(),
        2 => img.rotate180(),
        3 => img.rotate90(),
        _ => img,
    };
    encode(rotated, format)
}

fn resize_image(img: DynamicImage, size: Dimensions) -> DynamicImage {
    let (orig_w, orig_h) = img.dimensions();
    if orig_w == 0 || orig_h == 0 {
        return img;
    }
    match size.height {
        Some(height) => {
            debug!(width = size.width, height, "fitting image inside box");
            img.resize(size.width, height, FilterType::Lanczos3)
        }
        None => {
            let scaled = (orig_h as u64 * size.width as u64 + orig_w as u64 / 2) / orig_w as u64;
            let height = (scaled as u32).max(1);
            debug!(width = size.width, height, "scaling image to width");
            img.resize_exact(size.width, height, FilterType::Lanczos3)
        }
    }
}

fn encode(img: DynamicImage, format: RasterFormat) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format.image_format())?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn resize_to_width_keeps_aspect_ratio() {
        let src = png_bytes(400, 200);
        let resized = resize_bytes(&src, Dimensions::width(100), RasterFormat::Png).unwrap();
        let img = image::load_from_memory(&resized).unwrap();
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn resize_fits_inside_box() {
        let src = png_bytes(400, 200);
        let resized = resize_bytes(&src, Dimensions::new(100, 100), RasterFormat::Png).unwrap();
        let img = image::load_from_memory(&resized).unwrap();
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn full_turn_in_quarters_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spin.png");
        std::fs::write(&path, png_bytes(64, 32)).unwrap();

        for _ in 0..4 {
            let rotated = rotate_file(&path, 1, RasterFormat::Png).unwrap();
            std::fs::write(&path, rotated).unwrap();
        }

        let original = image::load_from_memory(&png_bytes(64, 32)).unwrap();
        let spun = image::open(&path).unwrap();
        assert_eq!(original.to_rgba8().as_raw(), spun.to_rgba8().as_raw());
    }
}
