// SPDX-License-Identifier: GPL-3.0-only

//! Still photo pipeline
//!
//! ```text
//! FrameProducer → Capture → Correct → Filter → Encode → Disk I/O
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: one still from the producer ([`capture`])
//! 2. **Correction**: physical rotation upright, orientation tag reset ([`correction`])
//! 3. **Filter**: catalog filter, degrading to unfiltered on failure ([`processing`])
//! 4. **Encoding**: JPEG with an EXIF orientation of 1 ([`encoding`])
//! 5. **Disk I/O**: parent directories created, bytes written
//!
//! Stages 2-4 are CPU-bound and run on the blocking pool.

pub mod capture;
pub mod correction;
pub mod encoding;
pub mod processing;

pub use capture::PhotoCapture;
pub use correction::{FrameCorrector, OrientedImage, rotate_pixels};
pub use encoding::{EncodedImage, PhotoEncoder};
pub use processing::{PostProcessor, ProcessedImage};

use crate::backends::camera::RawImage;
use crate::constants::JpegQuality;
use crate::errors::{CameraError, CameraResult};
use crate::filters::{FilterCatalog, FilterDescriptor};
use crate::orientation::{Rotation, required_rotation};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A still ready to persist
#[derive(Debug, Clone)]
pub struct FinalizedCapture {
    pub bytes: Vec<u8>,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Rotation applied to the pixels
    pub rotation: Rotation,
    pub filtered: bool,
}

/// Complete still pipeline: correct → filter → encode → save
pub struct PhotoPipeline {
    post_processor: PostProcessor,
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    pub fn new(catalog: Arc<FilterCatalog>, quality: JpegQuality) -> Self {
        Self {
            post_processor: PostProcessor::new(catalog),
            encoder: PhotoEncoder::new(quality),
        }
    }

    /// Correct, filter and encode a raw still. CPU-bound.
    ///
    /// `physical_orientation` is the device quadrant at capture time; the
    /// sensor angle and lens come from the still itself.
    pub fn finalize(
        &self,
        raw: RawImage,
        physical_orientation: Rotation,
        filter: &FilterDescriptor,
        target: PathBuf,
    ) -> CameraResult<FinalizedCapture> {
        let rotation = required_rotation(raw.sensor_mount_angle, raw.lens_facing, physical_orientation);
        let processed = self.post_processor.process(raw, rotation, filter);
        let encoded = self.encoder.encode(processed)?;

        Ok(FinalizedCapture {
            bytes: encoded.data,
            path: target,
            width: encoded.width,
            height: encoded.height,
            rotation,
            filtered: encoded.filtered,
        })
    }

    /// [`finalize`](Self::finalize) on the blocking pool, then write to disk
    pub async fn finalize_and_save(
        self: Arc<Self>,
        raw: RawImage,
        physical_orientation: Rotation,
        filter: FilterDescriptor,
        target: PathBuf,
    ) -> CameraResult<PathBuf> {
        let pipeline = Arc::clone(&self);
        let finalized = tokio::task::spawn_blocking(move || {
            pipeline.finalize(raw, physical_orientation, &filter, target)
        })
        .await
        .map_err(|e| CameraError::CaptureFailed(format!("post-processing task failed: {}", e)))??;

        info!(
            width = finalized.width,
            height = finalized.height,
            rotation = finalized.rotation.degrees(),
            filtered = finalized.filtered,
            "Capture finalized"
        );

        self.save(&finalized).await
    }

    /// Write a finalized capture to its target path
    pub async fn save(&self, finalized: &FinalizedCapture) -> CameraResult<PathBuf> {
        self.encoder.save(&finalized.bytes, &finalized.path).await
    }

    pub fn set_quality(&mut self, quality: JpegQuality) {
        self.encoder.set_quality(quality);
    }
}

/// Default capture path: `IMG_<timestamp>.jpg` under `dir`
pub fn timestamped_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format(crate::constants::CAPTURE_FILENAME_FORMAT);
    dir.join(format!("{}.jpg", stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::LensFacing;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_finalize_rotates_for_physical_orientation() {
        let pipeline = PhotoPipeline::new(Arc::new(FilterCatalog::new()), JpegQuality::High);
        let raw = RawImage::from_pixels(
            RgbaImage::from_pixel(40, 20, Rgba([90, 90, 90, 255])),
            Rotation::Rotate90,
            LensFacing::Back,
        );

        // Portrait device, back sensor at 90: rotate 90, dimensions swap
        let portrait = pipeline
            .finalize(raw.clone(), Rotation::None, &FilterDescriptor::none(), PathBuf::from("a.jpg"))
            .unwrap();
        assert_eq!(portrait.rotation, Rotation::Rotate90);
        assert_eq!((portrait.width, portrait.height), (20, 40));

        // Landscape device: sensor already upright
        let landscape = pipeline
            .finalize(raw, Rotation::Rotate90, &FilterDescriptor::none(), PathBuf::from("b.jpg"))
            .unwrap();
        assert_eq!(landscape.rotation, Rotation::None);
        assert_eq!((landscape.width, landscape.height), (40, 20));
    }

    #[test]
    fn test_timestamped_path_shape() {
        let path = timestamped_path(Path::new("/tmp/photos"));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(path.parent(), Some(Path::new("/tmp/photos")));
    }
}
