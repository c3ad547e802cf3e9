// SPDX-License-Identifier: GPL-3.0-only

//! Beauty Camera - live-filtered camera sessions with orientation-correct stills
//!
//! This library provides the engine behind a beauty camera plugin: it turns
//! sensor frames into correctly rotated, filtered preview frames and saves
//! still captures as upright JPEGs.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`orientation`]: Rotation math and the physical orientation tracker
//! - [`filters`]: The named filter catalog and its CPU implementation
//! - [`backends`]: Frame producer abstraction and a file-backed producer
//! - [`pipelines`]: Still capture pipeline and the capture serializer
//! - [`preview`]: Live filter rendering (CPU or GPU) on a worker thread
//! - [`session`]: The session object platforms talk to
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(Config::load())?;
//! session.attach_producer(Arc::new(FileFrameProducer::new("input.jpg")))?;
//! session.set_filter("sepia")?;
//! let path = session.request_capture(None).await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filters;
pub mod flash;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod orientation;
pub mod pipelines;
pub mod preview;
pub mod session;
#[cfg(feature = "gpu")]
pub mod shaders;

// Re-export commonly used types
pub use backends::camera::{FrameProducer, LensInfo, RawFrame, RawImage};
pub use config::{Config, RendererStrategy};
pub use constants::JpegQuality;
pub use errors::{CameraError, CameraResult, ErrorCode, ErrorReport};
pub use filters::{FilterCatalog, FilterDescriptor, FilterKind};
pub use flash::FlashMode;
pub use orientation::{LensFacing, PlatformRotation, Rotation, required_rotation};
pub use pipelines::capture::{CaptureSerializer, CaptureTicket};
pub use preview::LiveFilterRenderer;
pub use session::{Session, SessionCommand};
