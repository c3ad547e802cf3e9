// SPDX-License-Identifier: GPL-3.0-only

//! File-backed frame producer
//!
//! Serves an image file as if a sensor had captured it. Used by the CLI to
//! run real files through the capture pipeline, and by tests.

use crate::backends::camera::{CaptureSettings, FrameProducer, LensInfo, RawFrame, RawImage};
use crate::errors::{CameraError, CameraResult};
use crate::orientation::{LensFacing, Rotation};
use futures::future::BoxFuture;
use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

/// Typical phone layout: back sensor at 90°, front sensor at 270°
pub fn default_lenses() -> Vec<LensInfo> {
    vec![
        LensInfo {
            id: "0".to_string(),
            facing: LensFacing::Back,
            sensor_mount_angle: Rotation::Rotate90,
        },
        LensInfo {
            id: "1".to_string(),
            facing: LensFacing::Front,
            sensor_mount_angle: Rotation::Rotate270,
        },
    ]
}

/// Producer that "captures" the bytes of an image file
pub struct FileFrameProducer {
    path: PathBuf,
    lenses: Vec<LensInfo>,
    released: AtomicBool,
    captures: AtomicU64,
}

impl FileFrameProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_lenses(path, default_lenses())
    }

    pub fn with_lenses(path: impl Into<PathBuf>, lenses: Vec<LensInfo>) -> Self {
        Self {
            path: path.into(),
            lenses,
            released: AtomicBool::new(false),
            captures: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Number of completed captures
    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }
}

impl FrameProducer for FileFrameProducer {
    fn lenses(&self) -> Vec<LensInfo> {
        self.lenses.clone()
    }

    fn capture_still<'a>(&'a self, settings: &'a CaptureSettings) -> BoxFuture<'a, CameraResult<RawImage>> {
        Box::pin(async move {
            if self.is_released() {
                return Err(CameraError::CaptureFailed("camera already released".to_string()));
            }

            let lens = self.lens(settings.lens).ok_or_else(|| {
                CameraError::DeviceUnavailable(format!("no {} camera", settings.lens))
            })?;

            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                CameraError::CaptureFailed(format!("failed to read {}: {}", self.path.display(), e))
            })?;

            debug!(
                path = %self.path.display(),
                bytes = bytes.len(),
                lens = %lens.facing,
                flash = %settings.flash,
                zoom = settings.zoom,
                "File capture"
            );

            let orientation = embedded_orientation(&bytes);
            self.captures.fetch_add(1, Ordering::SeqCst);

            Ok(RawImage::from_encoded(bytes, lens.sensor_mount_angle, lens.facing)
                .with_orientation(orientation))
        })
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            info!(path = %self.path.display(), "File producer released");
        }
    }
}

/// Orientation tag stored in an encoded image, `NoTransforms` when absent
pub fn embedded_orientation(bytes: &[u8]) -> Orientation {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_decoder().ok())
        .and_then(|mut decoder| decoder.orientation().ok())
        .unwrap_or(Orientation::NoTransforms)
}

/// Load an image file as a preview frame from the given lens
pub fn load_preview_frame(path: &Path, lens: &LensInfo) -> CameraResult<RawFrame> {
    let image = image::open(path)
        .map_err(|e| CameraError::CaptureFailed(format!("failed to load {}: {}", path.display(), e)))?
        .to_rgba8();

    Ok(RawFrame::new(image, lens.sensor_mount_angle, lens.facing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::FlashMode;
    use crate::orientation::PlatformRotation;

    fn settings(lens: LensFacing) -> CaptureSettings {
        CaptureSettings {
            lens,
            flash: FlashMode::Off,
            zoom: 0.0,
            exposure: 0.0,
            focus_point: None,
            auto_focus: true,
            target_rotation: PlatformRotation::Rotation0,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_capture_failure() {
        let producer = FileFrameProducer::new("/nonexistent/beauty-camera.jpg");
        let err = producer
            .capture_still(&settings(LensFacing::Back))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::CaptureFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_lens_is_device_unavailable() {
        let producer = FileFrameProducer::with_lenses("/nonexistent.jpg", vec![]);
        let err = producer
            .capture_still(&settings(LensFacing::Front))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_release_stops_captures() {
        let producer = FileFrameProducer::new("/nonexistent.jpg");
        producer.release();
        assert!(producer.is_released());
        let err = producer
            .capture_still(&settings(LensFacing::Back))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::CaptureFailed(_)));
    }

    #[test]
    fn test_garbage_has_no_orientation() {
        assert_eq!(embedded_orientation(b"not an image"), Orientation::NoTransforms);
    }
}
