//! Transform capabilities: raster formats, rotation values, and the
//! path-in/path-out video transcoder contract.

pub mod image;
pub mod video;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FileKeeperError, Result};

pub use video::{CliTranscoder, VideoTranscoder};

/// Aspect-locked resize target. `height: None` means "scale to this width,
/// keep the aspect ratio"; with a height the image is fitted inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: Option<u32>,
}

impl Dimensions {
    pub fn width(width: u32) -> Self {
        Self {
            width,
            height: None,
        }
    }

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height: Some(height),
        }
    }
}

/// Raster formats the in-process codec can resize and rotate. Everything else
/// (svg, pdf, ...) bypasses transforms and is stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl RasterFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" | "image/x-png" => Some(RasterFormat::Png),
            "image/jpg" | "image/jpeg" | "image/pjpeg" => Some(RasterFormat::Jpeg),
            "image/gif" => Some(RasterFormat::Gif),
            "image/webp" | "image/x-webp" => Some(RasterFormat::WebP),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "png" => Some(RasterFormat::Png),
            "jpg" | "jpeg" => Some(RasterFormat::Jpeg),
            "gif" => Some(RasterFormat::Gif),
            "webp" => Some(RasterFormat::WebP),
            _ => None,
        }
    }

    pub(crate) fn image_format(self) -> ::image::ImageFormat {
        match self {
            RasterFormat::Png => ::image::ImageFormat::Png,
            RasterFormat::Jpeg => ::image::ImageFormat::Jpeg,
            RasterFormat::Gif => ::image::ImageFormat::Gif,
            RasterFormat::WebP => ::image::ImageFormat::WebP,
        }
    }
}

/// Whether the mime type names a format the raster codec can work on.
pub fn can_be_transformed(mime: &str) -> bool {
    RasterFormat::from_mime(mime).is_some()
}

/// Rotation request. Named directions carry fixed angles; explicit degrees are
/// normalized and must land on a quarter turn (the codec rotates losslessly in
/// 90-degree steps only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Left,
    Right,
    Turn,
    Degrees(i32),
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Left => 90,
            Rotation::Right => 270,
            Rotation::Turn => 180,
            Rotation::Degrees(d) => d,
        }
    }

    /// Number of counter-clockwise quarter turns, 0..=3.
    pub fn quarter_turns(self) -> Result<u32> {
        let normalized = self.degrees().rem_euclid(360);
        if normalized % 90 != 0 {
            return Err(FileKeeperError::Transform(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                self.degrees()
            )));
        }
        Ok((normalized / 90) as u32)
    }
}

impl FromStr for Rotation {
    type Err = FileKeeperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Rotation::Left),
            "right" => Ok(Rotation::Right),
            "turn" | "roll" => Ok(Rotation::Turn),
            other => other
                .parse::<i32>()
                .map(Rotation::Degrees)
                .map_err(|_| {
                    FileKeeperError::Transform(format!("unknown rotation value {:?}", other))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_directions_map_to_fixed_angles() {
        assert_eq!("left".parse::<Rotation>().unwrap().degrees(), 90);
        assert_eq!("right".parse::<Rotation>().unwrap().degrees(), 270);
        assert_eq!("turn".parse::<Rotation>().unwrap().degrees(), 180);
        assert_eq!("roll".parse::<Rotation>().unwrap().degrees(), 180);
        assert!("sideways".parse::<Rotation>().is_err());
    }

    #[test]
    fn degrees_normalize_to_quarter_turns() {
        assert_eq!(Rotation::Degrees(450).quarter_turns().unwrap(), 1);
        assert_eq!(Rotation::Degrees(-90).quarter_turns().unwrap(), 3);
        assert_eq!(Rotation::Degrees(0).quarter_turns().unwrap(), 0);
        assert!(Rotation::Degrees(45).quarter_turns().is_err());
    }

    #[test]
    fn transformable_formats() {
        assert!(can_be_transformed("image/png"));
        assert!(can_be_transformed("image/PJPEG"));
        assert!(can_be_transformed("image/webp"));
        assert!(!can_be_transformed("image/svg+xml"));
        assert!(!can_be_transformed("application/pdf"));
    }
}
