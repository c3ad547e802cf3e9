// SPDX-License-Identifier: GPL-3.0-only

//! 4x5 affine color matrix over RGBA
//!
//! Row `c` produces output channel `c`:
//! `out = m[c][0]*R + m[c][1]*G + m[c][2]*B + m[c][3]*A + m[c][4]`,
//! with channels and the translation column in 0-255 units.

use image::{Rgba, RgbaImage};

/// Color transform applied per pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    rows: [[f32; 5]; 4],
}

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix {
        rows: [
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
        ],
    };

    pub const fn from_rows(rows: [[f32; 5]; 4]) -> Self {
        Self { rows }
    }

    /// Matrix that only touches RGB; alpha passes through
    pub const fn rgb(r: [f32; 4], g: [f32; 4], b: [f32; 4]) -> Self {
        Self {
            rows: [
                [r[0], r[1], r[2], 0.0, r[3]],
                [g[0], g[1], g[2], 0.0, g[3]],
                [b[0], b[1], b[2], 0.0, b[3]],
                [0.0, 0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    pub fn rows(&self) -> &[[f32; 5]; 4] {
        &self.rows
    }

    /// `(1 - intensity) * identity + intensity * self`, element-wise
    pub fn blend_from_identity(&self, intensity: f32) -> Self {
        let mut rows = [[0.0; 5]; 4];
        for (c, row) in rows.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                let identity = Self::IDENTITY.rows[c][j];
                *value = (1.0 - intensity) * identity + intensity * self.rows[c][j];
            }
        }
        Self { rows }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Transform one pixel, clamping every channel to 0-255
    pub fn apply_pixel(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        let input = pixel.0.map(f32::from);
        let mut out = [0u8; 4];
        for (c, channel) in out.iter_mut().enumerate() {
            let row = &self.rows[c];
            let value = row[0] * input[0]
                + row[1] * input[1]
                + row[2] * input[2]
                + row[3] * input[3]
                + row[4];
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgba(out)
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut output = image.clone();
        for pixel in output.pixels_mut() {
            *pixel = self.apply_pixel(*pixel);
        }
        output
    }

    /// Columns of the linear 4x4 part (column-major upload for WGSL `mat4x4`)
    /// and the translation column scaled to 0-1.
    pub fn to_shader_layout(&self) -> ([[f32; 4]; 4], [f32; 4]) {
        let mut columns = [[0.0; 4]; 4];
        let mut bias = [0.0; 4];
        for c in 0..4 {
            for (j, column) in columns.iter_mut().enumerate() {
                column[c] = self.rows[c][j];
            }
            bias[c] = self.rows[c][4] / 255.0;
        }
        (columns, bias)
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
