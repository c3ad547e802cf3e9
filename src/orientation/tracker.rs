// SPDX-License-Identifier: GPL-3.0-only

//! Physical orientation sampling
//!
//! Raw motion-sensor readings (0-359°) are folded into four quadrants. Only a
//! quadrant change is reported, so a device wobbling inside one quadrant
//! produces no events. Unreadable samples keep the last known quadrant.

use super::Rotation;
use crate::constants::{ORIENTATION_BUCKETS, ORIENTATION_UNKNOWN};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// One reading from the orientation sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationSample {
    /// Clockwise device rotation in degrees, already reduced to 0-359
    Degrees(u32),
    /// Device flat or sensor unreadable
    Unknown,
}

impl OrientationSample {
    /// Interpret a raw platform reading.
    ///
    /// [`ORIENTATION_UNKNOWN`] and any other negative value are unreadable.
    pub fn from_raw(raw: i32) -> Self {
        if raw == ORIENTATION_UNKNOWN || raw < 0 {
            OrientationSample::Unknown
        } else {
            OrientationSample::Degrees(raw as u32 % 360)
        }
    }
}

impl From<Option<i32>> for OrientationSample {
    fn from(raw: Option<i32>) -> Self {
        raw.map_or(OrientationSample::Unknown, Self::from_raw)
    }
}

/// Quadrant containing `degrees`
pub fn bucket_for(degrees: u32) -> Rotation {
    let degrees = degrees % 360;
    ORIENTATION_BUCKETS
        .iter()
        .find(|(start, end, _)| (*start..*end).contains(&degrees))
        .map(|(_, _, bucket)| Rotation::from_degrees_int(*bucket as i32))
        .unwrap_or_default()
}

/// Angular distance between two headings, 0-180
fn circular_distance(a: u32, b: u32) -> u32 {
    let diff = a.abs_diff(b) % 360;
    diff.min(360 - diff)
}

/// Tracks the current physical orientation quadrant
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    current: Rotation,
    /// Extra degrees a reading must travel past a quadrant edge before the
    /// quadrant changes
    hysteresis: u32,
}

impl OrientationTracker {
    pub fn new(hysteresis_degrees: u32) -> Self {
        Self {
            current: Rotation::None,
            hysteresis: hysteresis_degrees.min(44),
        }
    }

    pub fn current(&self) -> Rotation {
        self.current
    }

    /// Feed a sample; returns the new quadrant only when it changed
    pub fn observe(&mut self, sample: OrientationSample) -> Option<Rotation> {
        let OrientationSample::Degrees(degrees) = sample else {
            return None;
        };

        if circular_distance(degrees, self.current.degrees()) < 45 + self.hysteresis {
            return None;
        }

        let next = bucket_for(degrees);
        if next == self.current {
            return None;
        }

        debug!(
            raw = degrees,
            from = self.current.degrees(),
            to = next.degrees(),
            "Physical orientation changed"
        );
        self.current = next;
        Some(next)
    }
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Published on every quadrant transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationEvent {
    pub device_orientation: u32,
    pub ui_orientation: u32,
    pub timestamp: DateTime<Utc>,
}

impl OrientationEvent {
    pub fn new(device_orientation: Rotation, ui_orientation: Rotation) -> Self {
        Self {
            device_orientation: device_orientation.degrees(),
            ui_orientation: ui_orientation.degrees(),
            timestamp: Utc::now(),
        }
    }
}
