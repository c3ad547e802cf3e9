// SPDX-License-Identifier: GPL-3.0-only

//! Capability interfaces to the platform camera
//!
//! ```text
//! ┌──────────────────────┐   capture_still()   ┌──────────────┐
//! │ FrameProducer        │ ──────────────────▶ │   Session    │
//! │ (CameraX, AVFound.)  │   RawFrame push     │              │
//! └──────────────────────┘ ──────────────────▶ │              │
//!                                              └──────┬───────┘
//!                                                     │ DisplayableFrame
//!                                                     ▼
//!                                              ┌──────────────┐
//!                                              │FrameConsumer │
//!                                              └──────────────┘
//! ```
//!
//! Platform adapters implement these traits; the core never sees the
//! concrete camera or view classes.

pub mod types;

pub use types::*;

use crate::errors::CameraResult;
use futures::future::BoxFuture;

/// Source of still captures and lens information
pub trait FrameProducer: Send + Sync {
    /// Lenses available on this device
    fn lenses(&self) -> Vec<LensInfo>;

    /// Capture one still image.
    ///
    /// Hardware errors are reported as [`CameraError::CaptureFailed`](crate::errors::CameraError).
    fn capture_still<'a>(&'a self, settings: &'a CaptureSettings) -> BoxFuture<'a, CameraResult<RawImage>>;

    /// Release hardware resources. Must not block on in-flight captures.
    fn release(&self) {}

    /// Lens with the given facing, if present
    fn lens(&self, facing: crate::orientation::LensFacing) -> Option<LensInfo> {
        self.lenses().into_iter().find(|lens| lens.facing == facing)
    }
}

/// Receives corrected preview frames for display
pub trait FrameConsumer: Send {
    fn present(&mut self, frame: DisplayableFrame);
}

impl<F> FrameConsumer for F
where
    F: FnMut(DisplayableFrame) + Send,
{
    fn present(&mut self, frame: DisplayableFrame) {
        self(frame)
    }
}
