// SPDX-License-Identifier: GPL-3.0-only
//! Compute shaders for the GPU preview strategy
//!
//! All filters operate on packed RGBA8 storage buffers.

mod gpu_filter;
mod gpu_processor;

pub use gpu_filter::{GpuFilterBackend, GpuFilterPipeline};
pub use gpu_processor::{FrameBuffers, compute_dispatch_size, rgba_len};

/// Filter compute shader (WGSL), one entry point per filter kind
pub const FILTER_SHADER: &str = include_str!("filters.wgsl");
