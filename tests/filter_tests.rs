// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the filter catalog

use beauty_camera::filters::{BuiltinFilter, ColorMatrix, FilterDefinition};
use beauty_camera::{FilterCatalog, FilterDescriptor, FilterKind};
use image::{Rgba, RgbaImage};

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 23 % 256) as u8, (y * 41 % 256) as u8, ((x + y) * 7 % 256) as u8, 255])
    })
}

#[test]
fn test_zero_intensity_is_identity_for_every_filter() {
    let catalog = FilterCatalog::new();
    let input = gradient(9, 7);

    for name in catalog.names() {
        let output = catalog.apply(&input, &FilterDescriptor::new(name, 0.0));
        assert_eq!(output, input, "filter '{}' changed pixels at intensity 0", name);
    }
}

#[test]
fn test_full_intensity_sepia_is_exact() {
    let catalog = FilterCatalog::new();
    let input = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
    let output = catalog.apply(&input, &FilterDescriptor::new("sepia", 1.0));
    assert_eq!(*output.get_pixel(0, 0), Rgba([25, 22, 17, 255]));
}

#[test]
fn test_full_intensity_negative_and_brightness() {
    let catalog = FilterCatalog::new();
    let input = RgbaImage::from_pixel(1, 1, Rgba([0, 100, 230, 200]));

    let negative = catalog.apply(&input, &FilterDescriptor::new("negative", 1.0));
    assert_eq!(*negative.get_pixel(0, 0), Rgba([255, 155, 25, 200]));

    let brighter = catalog.apply(&input, &FilterDescriptor::new("brightness", 1.0));
    assert_eq!(*brighter.get_pixel(0, 0), Rgba([50, 150, 255, 200]));
}

#[test]
fn test_half_intensity_lands_between() {
    let catalog = FilterCatalog::new();
    let input = RgbaImage::from_pixel(1, 1, Rgba([0, 100, 200, 255]));
    let half = catalog.apply(&input, &FilterDescriptor::new("negative", 0.5));
    // Halfway between v and 255 - v is 127.5 for every channel
    for channel in &half.get_pixel(0, 0).0[..3] {
        assert!((127..=128).contains(channel), "{}", channel);
    }
}

#[test]
fn test_blur_keeps_flat_images_flat() {
    let catalog = FilterCatalog::new();
    let input = RgbaImage::from_pixel(8, 8, Rgba([90, 120, 150, 255]));
    let output = catalog.apply(&input, &FilterDescriptor::new("blur", 1.0));
    assert_eq!(output, input);
}

#[test]
fn test_vignette_darkens_corners_only() {
    let catalog = FilterCatalog::new();
    let input = RgbaImage::from_pixel(21, 21, Rgba([200, 200, 200, 255]));
    let output = catalog.apply(&input, &FilterDescriptor::new("vignette", 1.0));

    assert_eq!(*output.get_pixel(10, 10), Rgba([200, 200, 200, 255]));
    assert!(output.get_pixel(0, 0).0[0] < 200);
    assert_eq!(output.get_pixel(0, 0).0[3], 255);
}

#[test]
fn test_names_aliases_and_kinds() {
    let catalog = FilterCatalog::new();
    assert_eq!(catalog.names().len(), BuiltinFilter::ALL.len());
    assert_eq!(catalog.canonical_name("  Grayscale "), Some("mono".to_string()));
    assert_eq!(catalog.kind_of("sepia"), FilterKind::ColorMatrix);
    assert_eq!(catalog.kind_of("sharpen"), FilterKind::ConvolutionKernel);
    assert_eq!(catalog.kind_of("vignette"), FilterKind::RadialVignette);
    assert_eq!(catalog.kind_of("none"), FilterKind::None);
}

#[test]
fn test_unknown_filter_renders_identity() {
    let catalog = FilterCatalog::new();
    let input = gradient(4, 4);
    let descriptor = FilterDescriptor::new("does-not-exist", 1.0);
    assert!(catalog.resolve(&descriptor).is_identity());
    assert_eq!(catalog.apply(&input, &descriptor), input);
}

#[test]
fn test_registered_filter_is_resolved() {
    let mut catalog = FilterCatalog::new();
    let red_only = ColorMatrix::rgb([1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0]);
    catalog
        .register("Red Only", FilterDefinition::ColorMatrix(red_only))
        .unwrap();

    let input = RgbaImage::from_pixel(1, 1, Rgba([40, 50, 60, 255]));
    let output = catalog.apply(&input, &FilterDescriptor::new("red only", 1.0));
    assert_eq!(*output.get_pixel(0, 0), Rgba([40, 0, 0, 255]));

    assert!(catalog.register("   ", FilterDefinition::Identity).is_err());
}

#[test]
fn test_descriptor_clamps_intensity() {
    assert_eq!(FilterDescriptor::new("sepia", 3.0).intensity(), 1.0);
    assert_eq!(FilterDescriptor::new("sepia", -1.0).intensity(), 0.0);
    assert_eq!(FilterDescriptor::new("sepia", f32::NAN).intensity(), 0.0);
}
