// SPDX-License-Identifier: GPL-3.0-only

//! Still-image post-processing: decode, correct, filter
//!
//! Filtering is cosmetic, so its failures degrade instead of failing the
//! capture:
//!
//! - undecodable payload: the producer's bytes are kept as delivered
//! - filter error: the corrected, unfiltered image is kept

use super::correction::{FrameCorrector, OrientedImage};
use crate::backends::camera::{RawImage, StillPayload};
use crate::errors::{CameraError, CameraResult};
use crate::filters::{FilterCatalog, FilterDescriptor};
use crate::orientation::Rotation;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of post-processing a still
#[derive(Debug, Clone)]
pub enum ProcessedImage {
    /// Upright pixels ready for encoding
    Pixels {
        image: RgbaImage,
        /// False when the filter was skipped after a failure
        filtered: bool,
    },
    /// Payload could not be decoded; bytes pass through untouched
    Passthrough(Vec<u8>),
}

/// Post-processor for captured stills
pub struct PostProcessor {
    catalog: Arc<FilterCatalog>,
    corrector: FrameCorrector,
}

impl PostProcessor {
    pub fn new(catalog: Arc<FilterCatalog>) -> Self {
        Self {
            catalog,
            corrector: FrameCorrector::new(),
        }
    }

    /// Decode, rotate upright, then filter. CPU-bound; call from a blocking task.
    pub fn process(
        &self,
        raw: RawImage,
        rotation: Rotation,
        filter: &FilterDescriptor,
    ) -> ProcessedImage {
        let pixels = match raw.payload {
            StillPayload::Pixels(image) => image,
            StillPayload::Encoded(bytes) => match Self::decode(&bytes) {
                Ok(image) => image,
                Err(e) => {
                    warn!(error = %e, "Could not decode capture, saving it unprocessed");
                    return ProcessedImage::Passthrough(bytes);
                }
            },
        };

        info!(
            width = pixels.width(),
            height = pixels.height(),
            rotation = rotation.degrees(),
            filter = filter.name(),
            intensity = filter.intensity(),
            "Starting post-processing"
        );

        // The embedded tag is replaced: the resolver's rotation is authoritative
        let corrected = self
            .corrector
            .correct(OrientedImage::new(pixels, raw.orientation), rotation);

        match self.apply_filter(&corrected.pixels, filter) {
            Ok(image) => {
                debug!(filter = filter.name(), "Filter applied to capture");
                ProcessedImage::Pixels {
                    image,
                    filtered: true,
                }
            }
            Err(e) => {
                warn!(error = %e, "Filter failed, using unfiltered capture");
                ProcessedImage::Pixels {
                    image: corrected.pixels,
                    filtered: false,
                }
            }
        }
    }

    fn decode(bytes: &[u8]) -> CameraResult<RgbaImage> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }

    fn apply_filter(&self, image: &RgbaImage, filter: &FilterDescriptor) -> CameraResult<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CameraError::FilterFailed("capture has no pixels".to_string()));
        }
        Ok(self.catalog.apply(image, filter))
    }
}
