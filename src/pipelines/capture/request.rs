// SPDX-License-Identifier: GPL-3.0-only

//! Capture requests and their one-shot completion
//!
//! Every request owns a [`Completion`] that is consumed by
//! [`Completion::resolve`]. A completion dropped without being resolved
//! reports `CaptureFailed` so the caller is never left waiting.

use super::callbacks::CallbackContext;
use crate::errors::{CameraError, CameraResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome delivered for a capture request: the written file or an error
pub type CaptureResult = CameraResult<PathBuf>;

type Callback = Box<dyn FnOnce(CaptureResult) + Send + 'static>;

enum Sink {
    Channel(oneshot::Sender<CaptureResult>),
    Callback {
        context: CallbackContext,
        callback: Callback,
    },
}

/// Exactly-once result delivery for one request
pub struct Completion {
    id: Uuid,
    sink: Option<Sink>,
}

impl Completion {
    /// Deliver the result. Consumes the completion, so it cannot fire twice.
    pub fn resolve(mut self, result: CaptureResult) {
        self.deliver(result);
    }

    fn deliver(&mut self, result: CaptureResult) {
        let Some(sink) = self.sink.take() else {
            return;
        };

        match &result {
            Ok(path) => debug!(request = %self.id, path = %path.display(), "Resolving capture"),
            Err(e) => debug!(request = %self.id, code = %e.code(), "Resolving capture with error"),
        }

        match sink {
            Sink::Channel(tx) => {
                if tx.send(result).is_err() {
                    debug!(request = %self.id, "Capture ticket dropped before completion");
                }
            }
            Sink::Callback { context, callback } => {
                context.dispatch(move || callback(result));
            }
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.sink.is_some() {
            warn!(request = %self.id, "Capture request dropped without a result");
            self.deliver(Err(CameraError::CaptureFailed(
                "capture request dropped before completion".to_string(),
            )));
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("id", &self.id)
            .field("pending", &self.sink.is_some())
            .finish()
    }
}

/// A queued request to capture one still to `output_path`
#[derive(Debug)]
pub struct CaptureRequest {
    pub id: Uuid,
    pub output_path: PathBuf,
    pub submitted_at: DateTime<Utc>,
    completion: Completion,
}

impl CaptureRequest {
    /// Request whose result is awaited through the returned ticket
    pub fn new(output_path: impl Into<PathBuf>) -> (Self, CaptureTicket) {
        let (tx, rx) = oneshot::channel();
        let request = Self::with_sink(output_path.into(), Sink::Channel(tx));
        let ticket = CaptureTicket {
            id: request.id,
            rx,
        };
        (request, ticket)
    }

    /// Request whose result is handed to `callback` on `context`
    pub fn with_callback<F>(output_path: impl Into<PathBuf>, context: &CallbackContext, callback: F) -> Self
    where
        F: FnOnce(CaptureResult) + Send + 'static,
    {
        Self::with_sink(
            output_path.into(),
            Sink::Callback {
                context: context.clone(),
                callback: Box::new(callback),
            },
        )
    }

    fn with_sink(output_path: PathBuf, sink: Sink) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            output_path,
            submitted_at: Utc::now(),
            completion: Completion {
                id,
                sink: Some(sink),
            },
        }
    }

    /// Resolve this request
    pub fn resolve(self, result: CaptureResult) {
        self.completion.resolve(result);
    }

    /// Split into path and completion so the work can run before resolving
    pub fn into_parts(self) -> (Uuid, PathBuf, Completion) {
        (self.id, self.output_path, self.completion)
    }
}

/// Awaitable handle for a request created with [`CaptureRequest::new`]
#[derive(Debug)]
pub struct CaptureTicket {
    id: Uuid,
    rx: oneshot::Receiver<CaptureResult>,
}

impl CaptureTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Result if it has already been delivered
    pub fn try_take(&mut self) -> Option<CaptureResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(lost())),
        }
    }

    /// Block the current thread until the result arrives. Not for async contexts.
    pub fn blocking_wait(self) -> CaptureResult {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(lost()))
    }
}

impl Future for CaptureTicket {
    type Output = CaptureResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(lost())))
    }
}

fn lost() -> CameraError {
    CameraError::CaptureFailed("capture result was lost".to_string())
}
