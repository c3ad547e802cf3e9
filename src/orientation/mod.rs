// SPDX-License-Identifier: GPL-3.0-only

//! Orientation model
//!
//! Two independent inputs decide how an image must be rotated:
//!
//! - the **physical device orientation**, sampled from the motion sensor and
//!   bucketed into quadrants by [`OrientationTracker`]
//! - the **locked UI orientation**, which the preview is pinned to
//!
//! Still captures are rotated for the physical orientation, the live preview
//! for the locked UI orientation. [`OrientationFrame`] keeps both side by side
//! so neither is mistaken for the other.

pub mod resolver;
pub mod tracker;

pub use resolver::{PlatformRotation, required_rotation, required_rotation_degrees};
pub use tracker::{OrientationEvent, OrientationSample, OrientationTracker, bucket_for};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clockwise rotation by a multiple of 90 degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    /// Upright
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl Rotation {
    /// All rotations in ascending order
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Rotate90,
        Rotation::Rotate180,
        Rotation::Rotate270,
    ];

    /// Create rotation from an integer degree value (normalised to 0-360).
    ///
    /// Values that are not a multiple of 90 fall back to [`Rotation::None`];
    /// use [`Rotation::from_quadrant`] when that must be rejected.
    pub fn from_degrees_int(degrees: i32) -> Self {
        Self::from_quadrant(degrees).unwrap_or_default()
    }

    /// Exact conversion: `Some` only for multiples of 90
    pub fn from_quadrant(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Rotate90),
            180 => Some(Rotation::Rotate180),
            270 => Some(Rotation::Rotate270),
            _ => None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }

    /// Rotation that undoes this one, `(360 - R) mod 360`
    pub fn inverse(&self) -> Self {
        Self::from_degrees_int(360 - self.degrees() as i32)
    }

    /// Shader code (0=None, 1=90CW, 2=180, 3=270CW)
    pub fn quarter_turns(&self) -> u32 {
        self.degrees() / 90
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl TryFrom<u32> for Rotation {
    type Error = String;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        i32::try_from(degrees)
            .ok()
            .filter(|d| *d < 360)
            .and_then(Rotation::from_quadrant)
            .ok_or_else(|| format!("{} is not one of 0, 90, 180, 270", degrees))
    }
}

/// Which way the lens faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    #[default]
    Back,
    /// Mirrored selfie lens
    Front,
}

impl LensFacing {
    pub fn opposite(&self) -> Self {
        match self {
            LensFacing::Back => LensFacing::Front,
            LensFacing::Front => LensFacing::Back,
        }
    }

    /// Sign applied to the device orientation when resolving image rotation.
    ///
    /// The front sensor is mirrored, so device rotation adds to its mount
    /// angle instead of cancelling it.
    pub fn orientation_sign(&self) -> i32 {
        match self {
            LensFacing::Back => -1,
            LensFacing::Front => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LensFacing::Back => "back",
            LensFacing::Front => "front",
        }
    }
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LensFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => Ok(LensFacing::Back),
            "front" | "selfie" => Ok(LensFacing::Front),
            other => Err(format!("unknown lens facing '{}'", other)),
        }
    }
}

/// Snapshot of everything that decides image rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationFrame {
    /// Fixed mounting angle of the active lens's sensor
    pub sensor_mount_angle: Rotation,
    pub lens_facing: LensFacing,
    /// Quadrant of the real-world device rotation
    pub physical_device_orientation: Rotation,
    /// Orientation the preview UI is pinned to
    pub locked_ui_orientation: Rotation,
}

impl OrientationFrame {
    /// Rotation that makes a still capture upright for the physical orientation
    pub fn capture_rotation(&self) -> Rotation {
        required_rotation(
            self.sensor_mount_angle,
            self.lens_facing,
            self.physical_device_orientation,
        )
    }

    /// Rotation that makes a preview frame upright on the pinned UI
    pub fn preview_rotation(&self) -> Rotation {
        required_rotation(
            self.sensor_mount_angle,
            self.lens_facing,
            self.locked_ui_orientation,
        )
    }

    pub fn with_physical_orientation(self, orientation: Rotation) -> Self {
        Self {
            physical_device_orientation: orientation,
            ..self
        }
    }

    pub fn with_lens(self, lens_facing: LensFacing, sensor_mount_angle: Rotation) -> Self {
        Self {
            lens_facing,
            sensor_mount_angle,
            ..self
        }
    }
}
