// SPDX-License-Identifier: GPL-3.0-only

//! Cosmetic image filters
//!
//! - [`matrix`]: 4x5 color matrices (sepia, mono, contrast, ...)
//! - [`kernel`]: square convolution kernels (blur, sharpen, edge)
//! - [`vignette`]: radial darkening
//! - [`catalog`]: the named registry tying them together
//!
//! Every filter is defined by its full effect and blended against the
//! identity by an intensity in [0, 1].

pub mod catalog;
pub mod kernel;
pub mod matrix;
pub mod vignette;

pub use catalog::{BuiltinFilter, FilterCatalog, FilterDefinition, ResolvedFilter};
pub use kernel::Kernel;
pub use matrix::ColorMatrix;
pub use vignette::Vignette;

use serde::{Deserialize, Serialize};

/// How a filter is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    /// Identity
    None,
    ColorMatrix,
    ConvolutionKernel,
    RadialVignette,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::ColorMatrix => "colorMatrix",
            FilterKind::ConvolutionKernel => "convolutionKernel",
            FilterKind::RadialVignette => "radialVignette",
        }
    }
}

/// Clamp an intensity into [0, 1]; NaN counts as 0
pub fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    }
}

/// Selected filter and how strongly it applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    name: String,
    intensity: f32,
}

impl FilterDescriptor {
    /// Names are stored lowercased; intensity is clamped, never rejected
    pub fn new(name: impl AsRef<str>, intensity: f32) -> Self {
        Self {
            name: catalog::normalize_name(name.as_ref()),
            intensity: clamp_intensity(intensity),
        }
    }

    /// The identity filter
    pub fn none() -> Self {
        Self::new(BuiltinFilter::None.name(), 1.0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn with_intensity(self, intensity: f32) -> Self {
        Self {
            intensity: clamp_intensity(intensity),
            ..self
        }
    }
}

impl Default for FilterDescriptor {
    fn default() -> Self {
        Self::none()
    }
}
