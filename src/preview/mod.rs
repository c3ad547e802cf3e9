// SPDX-License-Identifier: GPL-3.0-only

//! Live preview filtering
//!
//! [`LiveFilterRenderer`] turns producer frames into displayable frames:
//! rotate upright for the locked UI orientation, then run the active filter
//! through a [`FilterBackend`]. Two backends exist:
//!
//! - [`CpuFilterBackend`]: applies the catalog filter per frame
//! - `GpuFilterBackend` (feature `gpu`): one compute program per filter kind,
//!   intensity passed as uniforms
//!
//! [`worker::PreviewWorker`] runs the renderer on its own thread with
//! keep-latest frame delivery.

pub mod program_cache;
pub mod worker;

pub use program_cache::ProgramCache;
pub use worker::{PreviewSettings, PreviewSettingsSource, PreviewStats, PreviewWorker};

use crate::backends::camera::{DisplayableFrame, RawFrame};
use crate::config::RendererStrategy;
use crate::errors::{CameraError, CameraResult};
use crate::filters::{FilterCatalog, FilterDescriptor, FilterKind, ResolvedFilter};
use crate::orientation::{Rotation, required_rotation};
use crate::pipelines::photo::FrameCorrector;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Something that can apply a resolved filter to an upright frame
pub trait FilterBackend: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Filter `image`. Errors make the renderer show the frame unfiltered.
    fn apply(&mut self, image: &RgbaImage, filter: &ResolvedFilter) -> CameraResult<RgbaImage>;
}

/// Applies filters with the catalog's CPU implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuFilterBackend;

impl FilterBackend for CpuFilterBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn apply(&mut self, image: &RgbaImage, filter: &ResolvedFilter) -> CameraResult<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CameraError::FilterFailed("frame has no pixels".to_string()));
        }
        Ok(filter.apply(image))
    }
}

/// Pick a backend for `strategy`, falling back to the CPU when no GPU works
pub fn create_backend(strategy: RendererStrategy) -> Box<dyn FilterBackend> {
    match strategy {
        RendererStrategy::Cpu => {
            info!("Using CPU preview filters");
            Box::new(CpuFilterBackend)
        }
        RendererStrategy::Auto | RendererStrategy::Gpu => {
            #[cfg(feature = "gpu")]
            match pollster::block_on(crate::shaders::GpuFilterBackend::new()) {
                Ok(backend) => {
                    info!("Using GPU preview filters");
                    return Box::new(backend);
                }
                Err(e) if strategy == RendererStrategy::Gpu => {
                    warn!(error = %e, "GPU preview filters unavailable, using CPU");
                }
                Err(e) => {
                    info!(error = %e, "No GPU for preview filters, using CPU");
                }
            }

            #[cfg(not(feature = "gpu"))]
            if strategy == RendererStrategy::Gpu {
                warn!("Built without GPU support, using CPU preview filters");
            }

            Box::new(CpuFilterBackend)
        }
    }
}

/// Corrects and filters live frames
pub struct LiveFilterRenderer {
    backend: Box<dyn FilterBackend>,
    catalog: Arc<FilterCatalog>,
    corrector: FrameCorrector,
    descriptor: FilterDescriptor,
    resolved: ResolvedFilter,
}

impl LiveFilterRenderer {
    pub fn new(catalog: Arc<FilterCatalog>, backend: Box<dyn FilterBackend>) -> Self {
        Self {
            backend,
            catalog,
            corrector: FrameCorrector::new(),
            descriptor: FilterDescriptor::none(),
            resolved: ResolvedFilter::Identity,
        }
    }

    /// Renderer on the CPU backend
    pub fn cpu(catalog: Arc<FilterCatalog>) -> Self {
        Self::new(catalog, Box::new(CpuFilterBackend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.descriptor
    }

    pub fn active_kind(&self) -> FilterKind {
        self.resolved.kind()
    }

    /// Switch the active filter. Returns true when the filter kind changed.
    pub fn set_filter(&mut self, descriptor: FilterDescriptor) -> bool {
        if descriptor == self.descriptor {
            return false;
        }

        let resolved = self.catalog.resolve(&descriptor);
        let kind_changed = resolved.kind() != self.resolved.kind();
        debug!(
            filter = descriptor.name(),
            intensity = descriptor.intensity(),
            kind = resolved.kind().as_str(),
            kind_changed,
            "Preview filter updated"
        );

        self.descriptor = descriptor;
        self.resolved = resolved;
        kind_changed
    }

    /// Rotate a raw frame upright for `ui_orientation` and apply the filter
    pub fn render_frame(&mut self, frame: &RawFrame, ui_orientation: Rotation) -> DisplayableFrame {
        let rotation = required_rotation(frame.sensor_mount_angle, frame.lens_facing, ui_orientation);
        let upright = self.corrector.correct_shared(&frame.image, rotation);

        let (image, filtered) = if self.resolved.is_identity() {
            (upright, true)
        } else {
            match self.backend.apply(&upright, &self.resolved) {
                Ok(image) => (Arc::new(image), true),
                Err(e) => {
                    warn!(
                        error = %e,
                        backend = self.backend.name(),
                        sequence = frame.sequence,
                        "Preview filter failed, showing unfiltered frame"
                    );
                    (upright, false)
                }
            }
        };

        DisplayableFrame {
            image,
            sequence: frame.sequence,
            rotation,
            filter: self.descriptor.name().to_string(),
            filter_kind: self.resolved.kind(),
            intensity: self.descriptor.intensity(),
            filtered,
        }
    }
}
