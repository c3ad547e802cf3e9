// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame-size GPU buffers for the filter pipeline
//!
//! ```text
//!  upload ──▶ input (STORAGE) ──shader──▶ output (STORAGE) ──copy──▶ staging (MAP_READ) ──▶ readback
//! ```
//!
//! The three buffers are reallocated only when the frame size changes.

use crate::gpu::wgpu;

/// Bytes in a packed RGBA8 frame
pub fn rgba_len(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height) * 4
}

/// Workgroups needed to cover `dimension`
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

/// Input, output and readback buffers for one frame size
pub struct FrameBuffers {
    width: u32,
    height: u32,
    pub input: wgpu::Buffer,
    pub output: wgpu::Buffer,
    pub staging: wgpu::Buffer,
}

impl FrameBuffers {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = rgba_len(width, height);
        let make = |label: &str, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };

        Self {
            width,
            height,
            input: make(
                "preview_frame_in",
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            ),
            output: make(
                "preview_frame_out",
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            ),
            staging: make(
                "preview_frame_readback",
                wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            ),
        }
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    pub fn byte_len(&self) -> u64 {
        rgba_len(self.width, self.height)
    }

    /// Record the output → staging copy
    pub fn copy_to_staging(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(&self.output, 0, &self.staging, 0, self.byte_len());
    }

    /// Wait for submitted work, then copy the staging buffer out
    pub async fn read_back(&self, device: &wgpu::Device) -> Result<Vec<u8>, String> {
        let slice = self.staging.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |mapped| {
            let _ = tx.send(mapped);
        });

        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| format!("device poll failed: {:?}", e))?;
        rx.await
            .map_err(|_| "readback callback dropped".to_string())?
            .map_err(|e| format!("readback mapping failed: {:?}", e))?;

        let pixels = slice.get_mapped_range().to_vec();
        self.staging.unmap();
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_len_does_not_overflow() {
        assert_eq!(rgba_len(640, 480), 1_228_800);
        assert_eq!(rgba_len(70_000, 70_000), 19_600_000_000);
    }

    #[test]
    fn test_compute_dispatch_size() {
        assert_eq!(compute_dispatch_size(640, 16), 40);
        assert_eq!(compute_dispatch_size(641, 16), 41);
        assert_eq!(compute_dispatch_size(1, 16), 1);
    }
}
