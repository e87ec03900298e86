//! Image preparation pipeline.
//!
//! Turns a saved image file into dithered RGB565 pixels plus a placement
//! that centers the image on the panel.

pub mod dither;

pub use dither::dither_to_rgb565;

use image::imageops::FilterType;
use std::path::Path;
use thiserror::Error;

/// Image preparation errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has a zero dimension")]
    EmptyImage,
}

/// Decode scale factor.
///
/// `Half` integer-halves both dimensions; there is no finer scaling. Images
/// that are still oversized after halving are clipped at the panel edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    Full,
    Half,
}

/// Where and how large a decoded image lands on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Top-left offset, both always >= 0
    pub x: u32,
    pub y: u32,
    /// Dimensions after scaling
    pub width: u32,
    pub height: u32,
    pub scale: ScaleMode,
}

/// A decoded, scaled, dithered image ready to blit into a layer
pub struct PreparedImage {
    pub placement: Placement,
    /// `placement.width * placement.height` RGB565 pixels, row-major
    pub pixels: Vec<u16>,
}

/// Pick the scale factor: halve if either intrinsic dimension exceeds the
/// corresponding panel bound.
pub fn choose_scale(width: u32, height: u32, bounds: (u32, u32)) -> ScaleMode {
    if width > bounds.0 || height > bounds.1 {
        ScaleMode::Half
    } else {
        ScaleMode::Full
    }
}

/// Compute the placement for an image of intrinsic size `width` x `height`.
///
/// Offsets center the scaled image with floor division; an image larger than
/// a bound even after halving gets a zero offset on that axis.
pub fn place(width: u32, height: u32, bounds: (u32, u32)) -> Placement {
    let scale = choose_scale(width, height, bounds);

    let (scaled_w, scaled_h) = match scale {
        ScaleMode::Full => (width, height),
        ScaleMode::Half => ((width / 2).max(1), (height / 2).max(1)),
    };

    Placement {
        x: bounds.0.saturating_sub(scaled_w) / 2,
        y: bounds.1.saturating_sub(scaled_h) / 2,
        width: scaled_w,
        height: scaled_h,
        scale,
    }
}

/// Decode `path`, scale it per the placement rule, and dither to RGB565.
///
/// Pure with respect to display state: callers blit the result into a layer
/// only after this succeeds, so a decode failure never leaves a layer
/// half-loaded.
pub fn prepare(path: &Path, bounds: (u32, u32)) -> Result<PreparedImage, DecodeError> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;

    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }

    let placement = place(width, height, bounds);

    tracing::debug!(
        "Prepared {}: {}x{} -> {}x{} at ({}, {}), {:?}",
        path.display(),
        width,
        height,
        placement.width,
        placement.height,
        placement.x,
        placement.y,
        placement.scale
    );

    let rgb = if placement.scale == ScaleMode::Half {
        img.resize_exact(placement.width, placement.height, FilterType::Triangle)
            .into_rgb8()
    } else {
        img.into_rgb8()
    };

    let pixels = dither_to_rgb565(&rgb);

    Ok(PreparedImage { placement, pixels })
}
