// SPDX-License-Identifier: GPL-3.0-only

//! Required image rotation from sensor mount, lens facing, and device orientation
//!
//! ```text
//! back  lens: rotation = (sensor - device) mod 360
//! front lens: rotation = (sensor + device) mod 360
//! ```
//!
//! Both lens facings go through the same expression, with the sign taken from
//! [`LensFacing::orientation_sign`].

use super::{LensFacing, Rotation};
use serde::{Deserialize, Serialize};

/// Clockwise rotation that turns a sensor image upright
pub fn required_rotation(
    sensor_mount_angle: Rotation,
    lens_facing: LensFacing,
    device_orientation: Rotation,
) -> Rotation {
    let degrees = sensor_mount_angle.degrees() as i32
        + lens_facing.orientation_sign() * device_orientation.degrees() as i32;
    Rotation::from_degrees_int(degrees)
}

/// [`required_rotation`] in plain degrees (always 0, 90, 180 or 270)
pub fn required_rotation_degrees(
    sensor_mount_angle: Rotation,
    lens_facing: LensFacing,
    device_orientation: Rotation,
) -> u32 {
    required_rotation(sensor_mount_angle, lens_facing, device_orientation).degrees()
}

/// Display-rotation enum used by platform camera APIs when requesting a
/// target rotation.
///
/// Counts the opposite way to the physical orientation: a device turned 90°
/// clockwise reports a display rotation of 270.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlatformRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl PlatformRotation {
    pub fn from_physical_orientation(orientation: Rotation) -> Self {
        match orientation {
            Rotation::None => PlatformRotation::Rotation0,
            Rotation::Rotate90 => PlatformRotation::Rotation270,
            Rotation::Rotate180 => PlatformRotation::Rotation180,
            Rotation::Rotate270 => PlatformRotation::Rotation90,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            PlatformRotation::Rotation0 => 0,
            PlatformRotation::Rotation90 => 90,
            PlatformRotation::Rotation180 => 180,
            PlatformRotation::Rotation270 => 270,
        }
    }
}
