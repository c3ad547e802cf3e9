// SPDX-License-Identifier: GPL-3.0-only

//! Producers that stand in for real camera hardware

pub mod file_source;

pub use file_source::{FileFrameProducer, default_lenses, embedded_orientation, load_preview_frame};
