// SPDX-License-Identifier: GPL-3.0-only

//! Square convolution kernels with clamp-to-edge sampling

use crate::errors::{CameraError, CameraResult};
use image::{Rgba, RgbaImage};

/// Odd-sized square kernel, weights in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
}

impl Kernel {
    pub fn new(size: usize, weights: Vec<f32>) -> CameraResult<Self> {
        if size == 0 || size % 2 == 0 {
            return Err(CameraError::InvalidArgument(format!(
                "kernel size must be odd, got {}",
                size
            )));
        }
        if weights.len() != size * size {
            return Err(CameraError::InvalidArgument(format!(
                "{}x{} kernel needs {} weights, got {}",
                size,
                size,
                size * size,
                weights.len()
            )));
        }
        Ok(Self { size, weights })
    }

    /// Kernel that reproduces its input
    pub fn identity(size: usize) -> Self {
        let size = if size % 2 == 0 { size + 1 } else { size.max(1) };
        let mut weights = vec![0.0; size * size];
        weights[size * size / 2] = 1.0;
        Self { size, weights }
    }

    /// Normalised box blur
    pub fn box_blur(size: usize) -> Self {
        let size = if size % 2 == 0 { size + 1 } else { size.max(1) };
        let weight = 1.0 / (size * size) as f32;
        Self {
            size,
            weights: vec![weight; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// `(1 - intensity) * identity + intensity * self`
    pub fn blend_from_identity(&self, intensity: f32) -> Self {
        let center = self.weights.len() / 2;
        let weights = self
            .weights
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let identity = if i == center { 1.0 } else { 0.0 };
                (1.0 - intensity) * identity + intensity * w
            })
            .collect();
        Self {
            size: self.size,
            weights,
        }
    }

    /// Convolve RGB; alpha is carried over from the centre pixel.
    ///
    /// Out-of-bounds taps read the nearest in-bounds pixel.
    pub fn convolve(&self, image: &RgbaImage) -> RgbaImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image.clone();
        }

        let radius = (self.size / 2) as i64;
        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;

        RgbaImage::from_fn(width, height, |x, y| {
            let mut acc = [0.0f32; 3];
            for ky in 0..self.size as i64 {
                let sy = (y as i64 + ky - radius).clamp(0, max_y) as u32;
                for kx in 0..self.size as i64 {
                    let weight = self.weights[(ky * self.size as i64 + kx) as usize];
                    if weight == 0.0 {
                        continue;
                    }
                    let sx = (x as i64 + kx - radius).clamp(0, max_x) as u32;
                    let sample = image.get_pixel(sx, sy);
                    acc[0] += weight * f32::from(sample[0]);
                    acc[1] += weight * f32::from(sample[1]);
                    acc[2] += weight * f32::from(sample[2]);
                }
            }

            let alpha = image.get_pixel(x, y)[3];
            Rgba([
                acc[0].round().clamp(0.0, 255.0) as u8,
                acc[1].round().clamp(0.0, 255.0) as u8,
                acc[2].round().clamp(0.0, 255.0) as u8,
                alpha,
            ])
        })
    }
}
