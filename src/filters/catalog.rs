// SPDX-License-Identifier: GPL-3.0-only

//! Registry of named filters
//!
//! Names resolve case-insensitively, aliases included. A name the catalog
//! does not know resolves to the identity filter: a cosmetic effect never
//! blocks a capture.

use super::kernel::Kernel;
use super::matrix::ColorMatrix;
use super::vignette::Vignette;
use super::{FilterDescriptor, FilterKind};
use crate::constants::BLUR_KERNEL_SIZE;
use crate::errors::{CameraError, CameraResult};
use image::RgbaImage;
use std::collections::HashMap;
use tracing::debug;

/// Filters shipped with the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFilter {
    None,
    Sepia,
    Vintage,
    Cool,
    Warm,
    Mono,
    Negative,
    Contrast,
    Brightness,
    Blur,
    Sharpen,
    Edge,
    Vignette,
}

impl BuiltinFilter {
    pub const ALL: [BuiltinFilter; 13] = [
        BuiltinFilter::None,
        BuiltinFilter::Sepia,
        BuiltinFilter::Vintage,
        BuiltinFilter::Cool,
        BuiltinFilter::Warm,
        BuiltinFilter::Mono,
        BuiltinFilter::Negative,
        BuiltinFilter::Contrast,
        BuiltinFilter::Brightness,
        BuiltinFilter::Blur,
        BuiltinFilter::Sharpen,
        BuiltinFilter::Edge,
        BuiltinFilter::Vignette,
    ];

    /// Catalog key
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinFilter::None => "none",
            BuiltinFilter::Sepia => "sepia",
            BuiltinFilter::Vintage => "vintage",
            BuiltinFilter::Cool => "cool",
            BuiltinFilter::Warm => "warm",
            BuiltinFilter::Mono => "mono",
            BuiltinFilter::Negative => "negative",
            BuiltinFilter::Contrast => "contrast",
            BuiltinFilter::Brightness => "brightness",
            BuiltinFilter::Blur => "blur",
            BuiltinFilter::Sharpen => "sharpen",
            BuiltinFilter::Edge => "edge",
            BuiltinFilter::Vignette => "vignette",
        }
    }

    /// Extra names accepted for this filter
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            BuiltinFilter::None => &["original", "standard", ""],
            BuiltinFilter::Mono => &["grayscale", "greyscale"],
            BuiltinFilter::Negative => &["invert"],
            BuiltinFilter::Edge => &["edge_detect"],
            _ => &[],
        }
    }

    /// Full-effect definition (intensity 1.0)
    pub fn definition(&self) -> FilterDefinition {
        match self {
            BuiltinFilter::None => FilterDefinition::Identity,
            BuiltinFilter::Sepia => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [0.393, 0.769, 0.189, 0.0],
                [0.349, 0.686, 0.168, 0.0],
                [0.272, 0.534, 0.131, 0.0],
            )),
            BuiltinFilter::Vintage => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [0.6, 0.3, 0.1, 10.0],
                [0.2, 0.8, 0.1, 5.0],
                [0.1, 0.2, 0.7, 0.0],
            )),
            BuiltinFilter::Cool => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [1.0, 0.0, 0.2, 0.0],
                [0.0, 1.0, 0.1, 0.0],
                [0.0, 0.0, 1.3, 0.0],
            )),
            BuiltinFilter::Warm => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [1.3, 0.0, 0.0, 0.0],
                [0.0, 1.1, 0.0, 0.0],
                [0.0, 0.0, 0.8, 0.0],
            )),
            BuiltinFilter::Mono => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [0.299, 0.587, 0.114, 0.0],
                [0.299, 0.587, 0.114, 0.0],
                [0.299, 0.587, 0.114, 0.0],
            )),
            BuiltinFilter::Negative => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [-1.0, 0.0, 0.0, 255.0],
                [0.0, -1.0, 0.0, 255.0],
                [0.0, 0.0, -1.0, 255.0],
            )),
            BuiltinFilter::Contrast => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [2.0, 0.0, 0.0, -127.5],
                [0.0, 2.0, 0.0, -127.5],
                [0.0, 0.0, 2.0, -127.5],
            )),
            BuiltinFilter::Brightness => FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                [1.0, 0.0, 0.0, 50.0],
                [0.0, 1.0, 0.0, 50.0],
                [0.0, 0.0, 1.0, 50.0],
            )),
            BuiltinFilter::Blur => FilterDefinition::Convolution(Kernel::box_blur(BLUR_KERNEL_SIZE)),
            BuiltinFilter::Sharpen => FilterDefinition::Convolution(builtin_kernel(
                3,
                &[0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0],
            )),
            BuiltinFilter::Edge => FilterDefinition::Convolution(builtin_kernel(
                3,
                &[-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0],
            )),
            BuiltinFilter::Vignette => FilterDefinition::Vignette,
        }
    }

    /// Look up by name or alias, ignoring case and surrounding whitespace
    pub fn from_name(name: &str) -> Option<Self> {
        let key = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|f| f.name() == key || f.aliases().contains(&key.as_str()))
    }
}

/// Builtin kernels are fixed odd squares, checked by the catalog tests
fn builtin_kernel(size: usize, weights: &[f32]) -> Kernel {
    Kernel::new(size, weights.to_vec()).unwrap_or_else(|_| Kernel::identity(size))
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Full-effect parameters of a catalog entry
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDefinition {
    Identity,
    ColorMatrix(ColorMatrix),
    Convolution(Kernel),
    /// Radial falloff; strength follows intensity
    Vignette,
}

impl FilterDefinition {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterDefinition::Identity => FilterKind::None,
            FilterDefinition::ColorMatrix(_) => FilterKind::ColorMatrix,
            FilterDefinition::Convolution(_) => FilterKind::ConvolutionKernel,
            FilterDefinition::Vignette => FilterKind::RadialVignette,
        }
    }

    /// Effective parameters at `intensity` (already clamped)
    pub fn resolve(&self, intensity: f32) -> ResolvedFilter {
        if intensity <= 0.0 {
            return ResolvedFilter::Identity;
        }
        match self {
            FilterDefinition::Identity => ResolvedFilter::Identity,
            FilterDefinition::ColorMatrix(full) => {
                ResolvedFilter::ColorMatrix(full.blend_from_identity(intensity))
            }
            FilterDefinition::Convolution(full) => {
                ResolvedFilter::Convolution(full.blend_from_identity(intensity))
            }
            FilterDefinition::Vignette => ResolvedFilter::Vignette(Vignette::new(intensity)),
        }
    }
}

/// Filter parameters with intensity already folded in
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedFilter {
    Identity,
    ColorMatrix(ColorMatrix),
    Convolution(Kernel),
    Vignette(Vignette),
}

impl ResolvedFilter {
    pub fn kind(&self) -> FilterKind {
        match self {
            ResolvedFilter::Identity => FilterKind::None,
            ResolvedFilter::ColorMatrix(_) => FilterKind::ColorMatrix,
            ResolvedFilter::Convolution(_) => FilterKind::ConvolutionKernel,
            ResolvedFilter::Vignette(_) => FilterKind::RadialVignette,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ResolvedFilter::Identity)
    }

    /// CPU application
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        match self {
            ResolvedFilter::Identity => image.clone(),
            ResolvedFilter::ColorMatrix(matrix) => matrix.apply(image),
            ResolvedFilter::Convolution(kernel) => kernel.convolve(image),
            ResolvedFilter::Vignette(vignette) => vignette.apply(image),
        }
    }
}

/// Named filter registry
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    entries: HashMap<String, FilterDefinition>,
}

impl FilterCatalog {
    /// Catalog with every [`BuiltinFilter`]
    pub fn new() -> Self {
        let entries = BuiltinFilter::ALL
            .into_iter()
            .map(|f| (f.name().to_string(), f.definition()))
            .collect();
        Self { entries }
    }

    /// Add or replace a named filter
    pub fn register(&mut self, name: &str, definition: FilterDefinition) -> CameraResult<()> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(CameraError::InvalidArgument(
                "filter name must not be empty".to_string(),
            ));
        }
        self.entries.insert(key, definition);
        Ok(())
    }

    /// Canonical catalog key for `name` (aliases folded), if known
    pub fn canonical_name(&self, name: &str) -> Option<String> {
        let key = normalize_name(name);
        if self.entries.contains_key(&key) {
            return Some(key);
        }
        BuiltinFilter::from_name(&key).map(|f| f.name().to_string())
    }

    pub fn lookup(&self, name: &str) -> Option<&FilterDefinition> {
        self.canonical_name(name)
            .and_then(|key| self.entries.get(&key))
    }

    /// Kind of the named filter; unknown names are [`FilterKind::None`]
    pub fn kind_of(&self, name: &str) -> FilterKind {
        self.lookup(name)
            .map(FilterDefinition::kind)
            .unwrap_or(FilterKind::None)
    }

    /// Effective parameters for a descriptor
    pub fn resolve(&self, descriptor: &FilterDescriptor) -> ResolvedFilter {
        match self.lookup(descriptor.name()) {
            Some(definition) => definition.resolve(descriptor.intensity()),
            None => {
                debug!(filter = descriptor.name(), "Unknown filter, using identity");
                ResolvedFilter::Identity
            }
        }
    }

    /// Apply a descriptor to an image on the CPU
    pub fn apply(&self, image: &RgbaImage, descriptor: &FilterDescriptor) -> RgbaImage {
        self.resolve(descriptor).apply(image)
    }

    /// All catalog keys, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(6, 4, |x, y| {
            Rgba([(x * 40) as u8, (y * 60) as u8, ((x + y) * 20) as u8, 255])
        })
    }

    #[test]
    fn test_builtin_kernels_are_valid() {
        for filter in BuiltinFilter::ALL {
            if let FilterDefinition::Convolution(kernel) = filter.definition() {
                assert!(kernel.size() % 2 == 1);
                assert_ne!(kernel, Kernel::identity(kernel.size()), "{}", filter.name());
            }
        }
    }

    #[test]
    fn test_aliases_resolve() {
        let catalog = FilterCatalog::new();
        assert_eq!(catalog.canonical_name("Grayscale").as_deref(), Some("mono"));
        assert_eq!(catalog.canonical_name(" INVERT ").as_deref(), Some("negative"));
        assert_eq!(catalog.canonical_name("original").as_deref(), Some("none"));
        assert_eq!(catalog.canonical_name("sparkles"), None);
    }

    #[test]
    fn test_unknown_filter_is_identity() {
        let catalog = FilterCatalog::new();
        let image = sample();
        let out = catalog.apply(&image, &FilterDescriptor::new("sparkles", 1.0));
        assert_eq!(out, image);
        assert_eq!(catalog.kind_of("sparkles"), FilterKind::None);
    }

    #[test]
    fn test_kinds() {
        let catalog = FilterCatalog::new();
        assert_eq!(catalog.kind_of("sepia"), FilterKind::ColorMatrix);
        assert_eq!(catalog.kind_of("brightness"), FilterKind::ColorMatrix);
        assert_eq!(catalog.kind_of("blur"), FilterKind::ConvolutionKernel);
        assert_eq!(catalog.kind_of("edge"), FilterKind::ConvolutionKernel);
        assert_eq!(catalog.kind_of("vignette"), FilterKind::RadialVignette);
        assert_eq!(catalog.kind_of("none"), FilterKind::None);
    }

    #[test]
    fn test_negative_full_effect() {
        let catalog = FilterCatalog::new();
        let out = catalog.apply(&sample(), &FilterDescriptor::new("negative", 1.0));
        assert_eq!(out.get_pixel(1, 1), &Rgba([215, 195, 215, 255]));
    }

    #[test]
    fn test_register_custom_filter() {
        let mut catalog = FilterCatalog::new();
        catalog
            .register(
                "Blue Only",
                FilterDefinition::ColorMatrix(ColorMatrix::rgb(
                    [0.0; 4],
                    [0.0; 4],
                    [0.0, 0.0, 1.0, 0.0],
                )),
            )
            .unwrap();
        assert_eq!(catalog.kind_of("blue only"), FilterKind::ColorMatrix);
        assert!(catalog.register("  ", FilterDefinition::Identity).is_err());
    }
}
