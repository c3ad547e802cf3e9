// SPDX-License-Identifier: GPL-3.0-only

//! Still capture pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌───────────────────┐     ┌───────────┐
//! │   Request    │ ──▶ │ CaptureSerializer │ ──▶ │  Photo Pipeline   │ ──▶ │ JPEG File │
//! │ (path, cb)   │     │  - one in flight  │     │  - correction     │     │ (EXIF 1)  │
//! │              │     │  - FIFO backlog   │     │  - filter         │     │           │
//! │              │     │  - dispose drain  │     │  - encoding       │     │           │
//! └──────────────┘     └───────────────────┘     └───────────────────┘     └───────────┘
//! ```
//!
//! Heavy work runs on the blocking pool so the producer and the preview are
//! never stalled by a full-resolution still.

pub mod capture;
pub mod photo;
