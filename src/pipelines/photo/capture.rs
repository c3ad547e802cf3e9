// SPDX-License-Identifier: GPL-3.0-only

//! Still capture from the frame producer
//!
//! Thin stage that asks the producer for one still and logs what came back.
//! Producer errors surface unchanged so the request sees the hardware error.

use crate::backends::camera::{CaptureSettings, FrameProducer, RawImage, StillPayload};
use crate::errors::CameraResult;
use tracing::{debug, info};

/// Photo capture handler
pub struct PhotoCapture;

impl PhotoCapture {
    /// Capture a still with the given settings
    pub async fn capture_from_producer(
        producer: &dyn FrameProducer,
        settings: &CaptureSettings,
    ) -> CameraResult<RawImage> {
        info!(
            lens = %settings.lens,
            flash = %settings.flash,
            zoom = settings.zoom,
            target_rotation = settings.target_rotation.degrees(),
            "Capturing still"
        );

        let raw = producer.capture_still(settings).await?;

        match &raw.payload {
            StillPayload::Pixels(image) => debug!(
                width = image.width(),
                height = image.height(),
                sensor = raw.sensor_mount_angle.degrees(),
                "Still captured (pixels)"
            ),
            StillPayload::Encoded(bytes) => debug!(
                size = bytes.len(),
                sensor = raw.sensor_mount_angle.degrees(),
                "Still captured (encoded)"
            ),
        }

        Ok(raw)
    }
}
