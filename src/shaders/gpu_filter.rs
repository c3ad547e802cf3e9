// SPDX-License-Identifier: GPL-3.0-only
//! GPU filter pipeline for live preview frames
//!
//! One compute pipeline per filter kind, compiled on first use and kept in a
//! [`ProgramCache`]. Everything that varies within a kind (matrix
//! coefficients, kernel weights, vignette strength, and so intensity) is
//! written to the uniform buffer, so moving an intensity slider never
//! recompiles a shader.

use crate::constants::{MAX_KERNEL_SIZE, WORKGROUP_SIZE};
use crate::errors::{CameraError, CameraResult};
use crate::filters::{FilterKind, ResolvedFilter};
use crate::gpu::{GpuContext, wgpu};
use crate::preview::{FilterBackend, ProgramCache};
use crate::shaders::gpu_processor::{FrameBuffers, compute_dispatch_size, rgba_len};
use image::RgbaImage;
use tracing::{debug, info};

/// Kernel weight slots in the uniform block
const WEIGHT_VEC4S: usize = (MAX_KERNEL_SIZE * MAX_KERNEL_SIZE).div_ceil(4);

/// Filter parameters uniform, mirrors `FilterParams` in filters.wgsl
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FilterParams {
    width: u32,
    height: u32,
    kernel_size: u32,
    _padding: u32,
    transform: [[f32; 4]; 4],
    bias: [f32; 4],
    weights: [[f32; 4]; WEIGHT_VEC4S],
    vignette: [f32; 4],
}

impl FilterParams {
    /// Uniform contents for `filter` on a `width` x `height` frame
    pub(crate) fn for_filter(filter: &ResolvedFilter, width: u32, height: u32) -> CameraResult<Self> {
        let mut params = FilterParams {
            width,
            height,
            kernel_size: 1,
            _padding: 0,
            transform: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            bias: [0.0; 4],
            weights: [[0.0; 4]; WEIGHT_VEC4S],
            vignette: [0.0; 4],
        };

        match filter {
            ResolvedFilter::Identity => {}
            ResolvedFilter::ColorMatrix(matrix) => {
                let (columns, bias) = matrix.to_shader_layout();
                params.transform = columns;
                params.bias = bias;
            }
            ResolvedFilter::Convolution(kernel) => {
                if kernel.size() > MAX_KERNEL_SIZE {
                    return Err(CameraError::FilterFailed(format!(
                        "{}x{} kernel exceeds the GPU limit of {}",
                        kernel.size(),
                        kernel.size(),
                        MAX_KERNEL_SIZE
                    )));
                }
                params.kernel_size = kernel.size() as u32;
                for (i, weight) in kernel.weights().iter().enumerate() {
                    params.weights[i / 4][i % 4] = *weight;
                }
            }
            ResolvedFilter::Vignette(vignette) => {
                params.vignette = [vignette.strength, vignette.inner, vignette.outer, 0.0];
            }
        }

        Ok(params)
    }
}

/// Shader entry point for a filter kind
pub(crate) fn entry_point(kind: FilterKind) -> Option<&'static str> {
    match kind {
        FilterKind::None => None,
        FilterKind::ColorMatrix => Some("color_matrix_main"),
        FilterKind::ConvolutionKernel => Some("convolve_main"),
        FilterKind::RadialVignette => Some("vignette_main"),
    }
}

/// Compute programs for the preview filter, one per [`FilterKind`]
pub struct GpuFilterPipeline {
    context: GpuContext,
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    programs: ProgramCache<wgpu::ComputePipeline>,
    params: wgpu::Buffer,
    frames: Option<FrameBuffers>,
}

fn buffer_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl GpuFilterPipeline {
    /// Open a device and load the filter module. No program is compiled
    /// until a filter of that kind is first applied.
    pub async fn new() -> Result<Self, String> {
        let context = GpuContext::new("preview_filter").await?;
        let device = &context.device;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("preview_filters"),
            source: wgpu::ShaderSource::Wgsl(super::FILTER_SHADER.into()),
        });

        // Bindings mirror filters.wgsl: src_pixels, dst_pixels, params
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("preview_filter_bindings"),
            entries: &[
                buffer_entry(0, wgpu::BufferBindingType::Storage { read_only: true }),
                buffer_entry(1, wgpu::BufferBindingType::Storage { read_only: false }),
                buffer_entry(2, wgpu::BufferBindingType::Uniform),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("preview_filter_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("preview_filter_params"),
            size: std::mem::size_of::<FilterParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            context,
            module,
            bind_group_layout,
            pipeline_layout,
            programs: ProgramCache::new(),
            params,
            frames: None,
        })
    }

    /// Programs compiled so far
    pub fn compilations(&self) -> usize {
        self.programs.compilations()
    }

    pub fn active_kind(&self) -> Option<FilterKind> {
        self.programs.active()
    }

    pub fn device_info(&self) -> &crate::gpu::GpuDeviceInfo {
        &self.context.info
    }

    /// Apply a resolved filter to packed RGBA (`width * height * 4` bytes)
    pub async fn apply_filter_rgba(
        &mut self,
        rgba: &[u8],
        width: u32,
        height: u32,
        filter: &ResolvedFilter,
    ) -> Result<Vec<u8>, String> {
        let Some(entry) = entry_point(filter.kind()) else {
            return Ok(rgba.to_vec());
        };
        if width == 0 || height == 0 {
            return Err("cannot filter an empty frame".to_string());
        }
        let expected = rgba_len(width, height);
        if rgba.len() as u64 != expected {
            return Err(format!(
                "expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                rgba.len()
            ));
        }
        if expected > self.context.max_storage_bytes() {
            return Err(format!("{}x{} frame exceeds GPU storage limits", width, height));
        }

        let params = FilterParams::for_filter(filter, width, height).map_err(|e| e.to_string())?;

        if !self.frames.as_ref().is_some_and(|f| f.fits(width, height)) {
            debug!(width, height, "Allocating preview frame buffers");
            self.frames = Some(FrameBuffers::new(&self.context.device, width, height));
        }
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| "frame buffers missing".to_string())?;

        let device = &self.context.device;
        let module = &self.module;
        let layout = &self.pipeline_layout;
        let program = self.programs.get_or_compile(filter.kind(), |kind| {
            info!(kind = kind.as_str(), entry, "Compiling filter program");
            Ok::<_, String>(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(layout),
                module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            }))
        })?;

        let queue = &self.context.queue;
        queue.write_buffer(&frames.input, 0, rgba);
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("preview_filter_frame"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frames.input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: frames.output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("preview_filter"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(entry),
                timestamp_writes: None,
            });
            pass.set_pipeline(program);
            pass.set_bind_group(0, Some(&bind_group), &[]);
            pass.dispatch_workgroups(
                compute_dispatch_size(width, WORKGROUP_SIZE),
                compute_dispatch_size(height, WORKGROUP_SIZE),
                1,
            );
        }
        frames.copy_to_staging(&mut encoder);
        queue.submit(std::iter::once(encoder.finish()));

        frames.read_back(device).await
    }
}

/// [`FilterBackend`] over [`GpuFilterPipeline`]
///
/// Kernels too large for the uniform block run on the CPU instead.
pub struct GpuFilterBackend {
    pipeline: GpuFilterPipeline,
}

impl GpuFilterBackend {
    pub async fn new() -> Result<Self, String> {
        Ok(Self {
            pipeline: GpuFilterPipeline::new().await?,
        })
    }

    pub fn pipeline(&self) -> &GpuFilterPipeline {
        &self.pipeline
    }
}

impl FilterBackend for GpuFilterBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn apply(&mut self, image: &RgbaImage, filter: &ResolvedFilter) -> CameraResult<RgbaImage> {
        if matches!(filter, ResolvedFilter::Convolution(kernel) if kernel.size() > MAX_KERNEL_SIZE) {
            debug!("Kernel too large for GPU, filtering on CPU");
            return Ok(filter.apply(image));
        }

        let (width, height) = image.dimensions();
        let data = pollster::block_on(self.pipeline.apply_filter_rgba(
            image.as_raw(),
            width,
            height,
            filter,
        ))
        .map_err(CameraError::FilterFailed)?;

        RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| CameraError::FilterFailed("GPU returned a short buffer".to_string()))
    }
}
