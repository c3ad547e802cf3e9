// SPDX-License-Identifier: GPL-3.0-only

//! Compute device for the preview filter
//!
//! The preview thread owns exactly one [`GpuContext`]; nothing else touches
//! its queue, so submissions are serialized by construction.

use std::sync::Arc;
use tracing::{debug, info};

pub use wgpu;

/// Adapter the context runs on
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    pub adapter_name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
}

impl GpuDeviceInfo {
    /// CPU rasterizers (lavapipe, SwiftShader) count as available but slow
    pub fn is_software(&self) -> bool {
        self.device_type == wgpu::DeviceType::Cpu
    }
}

/// Device and queue for compute-only work
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub info: GpuDeviceInfo,
}

impl GpuContext {
    /// Open the preferred adapter. Only Vulkan and Metal are tried; there is
    /// no surface, so no presentation support is requested.
    pub async fn new(label: &str) -> Result<Self, String> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN | wgpu::Backends::METAL,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| format!("no usable GPU adapter: {}", e))?;

        let adapter_info = adapter.get_info();
        let info = GpuDeviceInfo {
            adapter_name: adapter_info.name,
            backend: adapter_info.backend,
            device_type: adapter_info.device_type,
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                // Preview frames fit well inside the downlevel storage limits
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|e| format!("GPU device request failed: {}", e))?;

        info!(
            label,
            adapter = %info.adapter_name,
            backend = ?info.backend,
            software = info.is_software(),
            "GPU context ready"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            info,
        })
    }

    /// Largest storage buffer the device accepts, in bytes
    pub fn max_storage_bytes(&self) -> u64 {
        let limits = self.device.limits();
        debug!(
            binding = limits.max_storage_buffer_binding_size,
            buffer = limits.max_buffer_size,
            "Storage limits"
        );
        u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size)
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext").field("info", &self.info).finish()
    }
}
