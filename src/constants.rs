// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use serde::{Deserialize, Serialize};

/// Directory name used under the platform config and pictures directories
pub const APP_DIR_NAME: &str = "beauty-camera";

/// JPEG quality presets for still captures
///
/// Every preset stays within the 90–95 band so saved photos never look
/// visibly compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JpegQuality {
    /// Smallest files that still look clean
    Standard,
    /// Default
    #[default]
    High,
    /// Largest files
    Maximum,
}

impl JpegQuality {
    /// All presets, lowest quality first
    pub const ALL: [JpegQuality; 3] = [JpegQuality::Standard, JpegQuality::High, JpegQuality::Maximum];

    /// Display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            JpegQuality::Standard => "Standard",
            JpegQuality::High => "High",
            JpegQuality::Maximum => "Maximum",
        }
    }

    /// Quality value handed to the JPEG encoder (0-100)
    pub fn value(&self) -> u8 {
        match self {
            JpegQuality::Standard => 90,
            JpegQuality::High => 92,
            JpegQuality::Maximum => 95,
        }
    }
}

/// Physical orientation quadrants as `(start, end, bucket)` in raw sensor degrees.
///
/// Ranges are half-open; the portrait quadrant wraps through 0.
pub const ORIENTATION_BUCKETS: [(u32, u32, u32); 5] = [
    (0, 45, 0),
    (45, 135, 90),
    (135, 225, 180),
    (225, 315, 270),
    (315, 360, 0),
];

/// Raw reading reported by platforms when the device is flat or the sensor is unreadable
pub const ORIENTATION_UNKNOWN: i32 = -1;

/// Vignette falloff begins at this fraction of the centre-to-corner radius
pub const VIGNETTE_INNER_FRACTION: f32 = 0.6;

/// Vignette reaches full strength at this fraction of the centre-to-corner radius
pub const VIGNETTE_OUTER_FRACTION: f32 = 1.0;

/// Side length of the box blur kernel
pub const BLUR_KERNEL_SIZE: usize = 5;

/// Largest kernel the GPU uniform block can hold (side length)
pub const MAX_KERNEL_SIZE: usize = 5;

/// Compute shader workgroup edge (16x16 threads)
pub const WORKGROUP_SIZE: u32 = 16;

/// How many times the preview worker re-renders a frame whose filter was
/// superseded mid-render before dropping it
pub const PREVIEW_STALE_RETRIES: usize = 3;

/// Exposure bias range in EV, symmetric around zero
pub const EXPOSURE_BIAS_LIMIT: f32 = 2.0;

/// Capacity of the orientation event broadcast channel
pub const ORIENTATION_EVENT_CAPACITY: usize = 16;

/// Filename pattern for captures without an explicit path (chrono format)
pub const CAPTURE_FILENAME_FORMAT: &str = "IMG_%Y%m%d_%H%M%S";
