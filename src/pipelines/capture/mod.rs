// SPDX-License-Identifier: GPL-3.0-only

//! Serialized still capture
//!
//! ```text
//!            submit            finish (queue empty)
//!   Idle ─────────────▶ Capturing ─────────────────▶ Idle
//!                        │    ▲
//!                 submit │    │ finish (pop next)
//!                        ▼    │
//!                      pending FIFO
//! ```
//!
//! The serializer only arbitrates; the owner runs the capture for the request
//! it is handed and calls [`CaptureSerializer::finish`] when it is done.

pub mod callbacks;
pub mod request;

pub use callbacks::CallbackContext;
pub use request::{CaptureRequest, CaptureResult, CaptureTicket, Completion};

use crate::errors::CameraError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Serializer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Capturing,
}

/// What the caller must do with a submitted request
#[derive(Debug)]
pub enum Admission {
    /// Nothing was in flight: run this request now
    Start(CaptureRequest),
    /// Queued behind the active capture, `position` requests ahead of it
    Queued { position: usize },
    /// The serializer is disposed; the request was resolved with `Disposed`
    Rejected,
}

#[derive(Debug)]
struct State {
    phase: CapturePhase,
    pending: VecDeque<CaptureRequest>,
    disposed: bool,
}

/// One-at-a-time capture arbitration with a FIFO backlog
#[derive(Debug)]
pub struct CaptureSerializer {
    state: Mutex<State>,
}

impl CaptureSerializer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                phase: CapturePhase::Idle,
                pending: VecDeque::new(),
                disposed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Admit a request. Never blocks on the active capture.
    pub fn submit(&self, request: CaptureRequest) -> Admission {
        let rejected = {
            let mut state = self.lock();
            if state.disposed {
                Some(request)
            } else {
                match state.phase {
                    CapturePhase::Idle => {
                        state.phase = CapturePhase::Capturing;
                        debug!(request = %request.id, "Capture starting immediately");
                        return Admission::Start(request);
                    }
                    CapturePhase::Capturing => {
                        let position = state.pending.len();
                        debug!(request = %request.id, position, "Capture queued");
                        state.pending.push_back(request);
                        return Admission::Queued { position };
                    }
                }
            }
        };

        if let Some(request) = rejected {
            info!(request = %request.id, "Capture rejected after dispose");
            request.resolve(Err(CameraError::Disposed));
        }
        Admission::Rejected
    }

    /// Mark the active capture done and hand back the next one, if any.
    ///
    /// Returns `None` and goes idle when the backlog is empty or the
    /// serializer was disposed.
    pub fn finish(&self) -> Option<CaptureRequest> {
        let mut state = self.lock();
        match state.pending.pop_front() {
            Some(next) => {
                debug!(request = %next.id, remaining = state.pending.len(), "Next capture");
                Some(next)
            }
            None => {
                state.phase = CapturePhase::Idle;
                None
            }
        }
    }

    /// Refuse further requests and fail the backlog with `Disposed`, oldest
    /// first. The in-flight capture, if any, is left to finish. Returns the
    /// number of requests drained; a second call drains nothing.
    pub fn dispose(&self) -> usize {
        let drained: Vec<CaptureRequest> = {
            let mut state = self.lock();
            if state.disposed {
                return 0;
            }
            state.disposed = true;
            state.pending.drain(..).collect()
        };

        let count = drained.len();
        for request in drained {
            request.resolve(Err(CameraError::Disposed));
        }
        info!(drained = count, "Capture serializer disposed");
        count
    }

    pub fn phase(&self) -> CapturePhase {
        self.lock().phase
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl Default for CaptureSerializer {
    fn default() -> Self {
        Self::new()
    }
}
