// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding and saving for still captures
//!
//! Output always carries an EXIF APP1 segment with Orientation = 1, since the
//! pixels were already rotated upright.

use super::processing::ProcessedImage;
use crate::constants::JpegQuality;
use crate::errors::{CameraError, CameraResult};
use image::RgbaImage;
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_SOFTWARE: u16 = 0x0131;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;

/// Encoded image data ready for saving
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// False when the filter could not be applied
    pub filtered: bool,
}

/// Photo encoder
#[derive(Debug, Clone)]
pub struct PhotoEncoder {
    quality: JpegQuality,
    software: String,
}

impl PhotoEncoder {
    pub fn new(quality: JpegQuality) -> Self {
        Self {
            quality,
            software: format!("beauty-camera {}", env!("GIT_VERSION")),
        }
    }

    pub fn quality(&self) -> JpegQuality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: JpegQuality) {
        self.quality = quality;
    }

    /// Encode a processed still. CPU-bound.
    pub fn encode(&self, processed: ProcessedImage) -> CameraResult<EncodedImage> {
        match processed {
            ProcessedImage::Pixels { image, filtered } => {
                let jpeg = self.encode_jpeg(&image)?;
                let data = insert_app1(&jpeg, &exif_segment(Orientation::NoTransforms, &self.software))?;
                debug!(size = data.len(), quality = self.quality.value(), "Encoding complete");
                Ok(EncodedImage {
                    data,
                    width: image.width(),
                    height: image.height(),
                    filtered,
                })
            }
            ProcessedImage::Passthrough(data) => {
                warn!(size = data.len(), "Saving producer bytes without re-encoding");
                Ok(EncodedImage {
                    data,
                    width: 0,
                    height: 0,
                    filtered: false,
                })
            }
        }
    }

    /// Encode image as JPEG (alpha dropped)
    fn encode_jpeg(&self, image: &RgbaImage) -> CameraResult<Vec<u8>> {
        let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality.value());

        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CameraError::CaptureFailed(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }

    /// Write encoded bytes to `path`, creating parent directories
    pub async fn save(&self, data: &[u8], path: &Path) -> CameraResult<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CameraError::CaptureFailed(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::write(path, data).await.map_err(|e| {
            CameraError::CaptureFailed(format!("failed to save {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), size = data.len(), "Photo saved");
        Ok(path.to_path_buf())
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(JpegQuality::default())
    }
}

/// Build an APP1 payload holding a little-endian TIFF IFD0 with the
/// Orientation and Software tags
pub fn exif_segment(orientation: Orientation, software: &str) -> Vec<u8> {
    let mut text = software.as_bytes().to_vec();
    text.push(0);

    // TIFF header (8) + entry count (2) + two entries (24) + next IFD (4)
    let text_offset: u32 = 8 + 2 + 12 * 2 + 4;

    let mut tiff = Vec::with_capacity(text_offset as usize + text.len());
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());

    tiff.extend_from_slice(&2u16.to_le_bytes());

    tiff.extend_from_slice(&TAG_ORIENTATION.to_le_bytes());
    tiff.extend_from_slice(&TYPE_SHORT.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&u16::from(orientation.to_exif()).to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);

    tiff.extend_from_slice(&TAG_SOFTWARE.to_le_bytes());
    tiff.extend_from_slice(&TYPE_ASCII.to_le_bytes());
    tiff.extend_from_slice(&(text.len() as u32).to_le_bytes());
    if text.len() <= 4 {
        let mut inline = [0u8; 4];
        inline[..text.len()].copy_from_slice(&text);
        tiff.extend_from_slice(&inline);
    } else {
        tiff.extend_from_slice(&text_offset.to_le_bytes());
    }

    tiff.extend_from_slice(&0u32.to_le_bytes());
    if text.len() > 4 {
        tiff.extend_from_slice(&text);
    }

    let mut payload = EXIF_HEADER.to_vec();
    payload.extend_from_slice(&tiff);
    payload
}

/// Insert an APP1 segment after SOI (and after a JFIF APP0, if present)
pub fn insert_app1(jpeg: &[u8], payload: &[u8]) -> CameraResult<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(CameraError::CaptureFailed("encoder output is not a JPEG".to_string()));
    }

    let segment_len = payload.len() + 2;
    if segment_len > u16::MAX as usize {
        return Err(CameraError::CaptureFailed("EXIF segment too large".to_string()));
    }

    let mut insert_at = 2;
    if jpeg[2] == 0xFF && jpeg[3] == 0xE0 && jpeg.len() >= 6 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        insert_at = (2 + 2 + app0_len).min(jpeg.len());
    }

    let mut out = Vec::with_capacity(jpeg.len() + segment_len + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&(segment_len as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}
