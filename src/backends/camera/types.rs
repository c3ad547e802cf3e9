// SPDX-License-Identifier: GPL-3.0-only

//! Frame and capture types exchanged with platform camera adapters

use crate::filters::FilterKind;
use crate::flash::FlashMode;
use crate::orientation::{LensFacing, PlatformRotation, Rotation};
use image::RgbaImage;
use image::metadata::Orientation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// A physical camera the producer can capture from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensInfo {
    /// Platform identifier (e.g. camera id "0")
    pub id: String,
    pub facing: LensFacing,
    /// Fixed mounting angle of the sensor
    pub sensor_mount_angle: Rotation,
}

/// Point of interest in normalized frame coordinates, (0,0) top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f32,
    pub y: f32,
}

impl FocusPoint {
    /// `None` unless both coordinates lie in 0-1
    pub fn new(x: f32, y: f32) -> Option<Self> {
        let valid = |v: f32| (0.0..=1.0).contains(&v);
        (valid(x) && valid(y)).then_some(Self { x, y })
    }
}

/// Parameters passed through to the producer for a still capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub lens: LensFacing,
    pub flash: FlashMode,
    /// Linear zoom, 0.0 (widest) to 1.0
    pub zoom: f32,
    /// Exposure bias in EV
    pub exposure: f32,
    pub focus_point: Option<FocusPoint>,
    pub auto_focus: bool,
    /// Display rotation requested from the platform
    pub target_rotation: PlatformRotation,
}

/// A live preview frame as delivered by the producer
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub image: Arc<RgbaImage>,
    pub sensor_mount_angle: Rotation,
    pub lens_facing: LensFacing,
    /// Target rotation the platform was asked for when the frame was produced
    pub platform_rotation_hint: PlatformRotation,
    /// Assigned when the frame enters the preview queue
    pub sequence: u64,
    pub captured_at: Instant,
}

impl RawFrame {
    pub fn new(image: RgbaImage, sensor_mount_angle: Rotation, lens_facing: LensFacing) -> Self {
        Self {
            image: Arc::new(image),
            sensor_mount_angle,
            lens_facing,
            platform_rotation_hint: PlatformRotation::default(),
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Still image pixels as handed over by the producer
#[derive(Debug, Clone)]
pub enum StillPayload {
    /// Already decoded
    Pixels(RgbaImage),
    /// Compressed bytes (typically JPEG straight from the hardware encoder)
    Encoded(Vec<u8>),
}

/// A captured still before correction
#[derive(Debug, Clone)]
pub struct RawImage {
    pub payload: StillPayload,
    pub sensor_mount_angle: Rotation,
    pub lens_facing: LensFacing,
    /// Orientation tag embedded by the producer, if any
    pub orientation: Orientation,
}

impl RawImage {
    pub fn from_pixels(image: RgbaImage, sensor_mount_angle: Rotation, lens_facing: LensFacing) -> Self {
        Self {
            payload: StillPayload::Pixels(image),
            sensor_mount_angle,
            lens_facing,
            orientation: Orientation::NoTransforms,
        }
    }

    pub fn from_encoded(bytes: Vec<u8>, sensor_mount_angle: Rotation, lens_facing: LensFacing) -> Self {
        Self {
            payload: StillPayload::Encoded(bytes),
            sensor_mount_angle,
            lens_facing,
            orientation: Orientation::NoTransforms,
        }
    }

    pub fn with_orientation(self, orientation: Orientation) -> Self {
        Self {
            orientation,
            ..self
        }
    }
}

/// Corrected (and possibly filtered) preview frame ready for display
#[derive(Debug, Clone)]
pub struct DisplayableFrame {
    pub image: Arc<RgbaImage>,
    pub sequence: u64,
    /// Rotation that was applied to the raw frame
    pub rotation: Rotation,
    /// Catalog key of the filter in effect
    pub filter: String,
    pub filter_kind: FilterKind,
    pub intensity: f32,
    /// False when the filter failed and the frame is shown unfiltered
    pub filtered: bool,
}

impl DisplayableFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
