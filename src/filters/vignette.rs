// SPDX-License-Identifier: GPL-3.0-only

//! Radial vignette
//!
//! Black composited over the image with an alpha that ramps linearly from 0 at
//! the inner radius to `strength` at the outer radius. Radii are fractions of
//! the centre-to-corner distance.

use crate::constants::{VIGNETTE_INNER_FRACTION, VIGNETTE_OUTER_FRACTION};
use image::{Rgba, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vignette {
    pub strength: f32,
    pub inner: f32,
    pub outer: f32,
}

impl Vignette {
    pub fn new(strength: f32) -> Self {
        Self {
            strength,
            inner: VIGNETTE_INNER_FRACTION,
            outer: VIGNETTE_OUTER_FRACTION,
        }
    }

    /// Darkening factor at a normalised distance from the centre
    pub fn falloff(&self, distance: f32) -> f32 {
        let span = (self.outer - self.inner).max(f32::EPSILON);
        let t = ((distance - self.inner) / span).clamp(0.0, 1.0);
        self.strength * t
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let (width, height) = image.dimensions();
        let cx = width as f32 * 0.5;
        let cy = height as f32 * 0.5;
        let max_radius = (cx * cx + cy * cy).sqrt().max(f32::EPSILON);

        let mut output = image.clone();
        for (x, y, pixel) in output.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let alpha = self.falloff((dx * dx + dy * dy).sqrt() / max_radius);
            if alpha <= 0.0 {
                continue;
            }
            let keep = 1.0 - alpha;
            let [r, g, b, a] = pixel.0;
            *pixel = Rgba([
                (f32::from(r) * keep).round() as u8,
                (f32::from(g) * keep).round() as u8,
                (f32::from(b) * keep).round() as u8,
                a,
            ]);
        }
        output
    }
}
