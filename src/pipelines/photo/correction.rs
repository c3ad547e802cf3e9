// SPDX-License-Identifier: GPL-3.0-only

//! Physical orientation correction
//!
//! Pixels are rotated for real and the orientation tag is reset to normal,
//! so viewers that honour the tag cannot rotate the image a second time.

use crate::orientation::Rotation;
use image::RgbaImage;
use image::imageops;
use image::metadata::Orientation;
use std::sync::Arc;

/// Pixel buffer plus the orientation tag that travels with it
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedImage {
    pub pixels: RgbaImage,
    pub orientation: Orientation,
}

impl OrientedImage {
    pub fn new(pixels: RgbaImage, orientation: Orientation) -> Self {
        Self {
            pixels,
            orientation,
        }
    }

    /// Untagged image
    pub fn upright(pixels: RgbaImage) -> Self {
        Self::new(pixels, Orientation::NoTransforms)
    }
}

/// Rotate a pixel buffer clockwise
pub fn rotate_pixels(image: &RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation {
        Rotation::None => image.clone(),
        Rotation::Rotate90 => imageops::rotate90(image),
        Rotation::Rotate180 => imageops::rotate180(image),
        Rotation::Rotate270 => imageops::rotate270(image),
    }
}

/// Turns sensor images upright
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCorrector;

impl FrameCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Rotate by `rotation` (clockwise) and mark the result as upright.
    ///
    /// A zero rotation hands the input back untouched.
    pub fn correct(&self, image: OrientedImage, rotation: Rotation) -> OrientedImage {
        if rotation == Rotation::None {
            return image;
        }

        OrientedImage {
            pixels: rotate_pixels(&image.pixels, rotation),
            orientation: Orientation::NoTransforms,
        }
    }

    /// Shared-buffer variant for preview frames; a zero rotation shares the
    /// input buffer instead of copying it.
    pub fn correct_shared(&self, image: &Arc<RgbaImage>, rotation: Rotation) -> Arc<RgbaImage> {
        if rotation == Rotation::None {
            return Arc::clone(image);
        }
        Arc::new(rotate_pixels(image, rotation))
    }
}
