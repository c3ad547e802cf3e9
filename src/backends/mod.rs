// SPDX-License-Identifier: GPL-3.0-only

//! Platform camera boundary
//!
//! - [`camera`]: the `FrameProducer` / `FrameConsumer` traits and frame types
//! - [`virtual_camera`]: producers backed by files instead of hardware

pub mod camera;
pub mod virtual_camera;
