// SPDX-License-Identifier: GPL-3.0-only

//! Single callback context for completion delivery
//!
//! All completion callbacks run one after another on one dedicated thread, so
//! a caller never sees two callbacks at once and sees them in the order the
//! results were produced.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use tracing::{debug, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    name: String,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    thread_id: Option<ThreadId>,
}

/// Handle to the callback thread. Clones share the same thread.
#[derive(Clone)]
pub struct CallbackContext {
    inner: Arc<Inner>,
}

impl CallbackContext {
    /// Spawn the callback thread
    pub fn new(name: &str) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let thread_name = name.to_string();

        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            debug!(name = %thread_name, "Callback thread started");
            while let Ok(job) = rx.recv() {
                job();
            }
            info!(name = %thread_name, "Callback thread exiting");
        });

        let (sender, thread_id) = match spawned {
            Ok(handle) => (Some(tx), Some(handle.thread().id())),
            Err(e) => {
                warn!(name, error = %e, "Could not spawn callback thread, callbacks run inline");
                (None, None)
            }
        };

        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                sender: Mutex::new(sender),
                thread_id,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True when called from the callback thread itself
    pub fn is_current(&self) -> bool {
        self.inner.thread_id == Some(thread::current().id())
    }

    /// Queue `job` behind every callback already dispatched.
    ///
    /// If the thread is gone the job runs inline, so it still runs exactly once.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let job: Job = Box::new(job);
        let rejected = {
            let guard = match self.inner.sender.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.as_ref() {
                Some(tx) => tx.send(job).err().map(|mpsc::SendError(job)| job),
                None => Some(job),
            }
        };

        if let Some(job) = rejected {
            debug!(name = %self.inner.name, "Callback thread unavailable, running inline");
            job();
        }
    }

    /// Wait until every callback dispatched so far has run
    pub fn flush(&self) {
        if self.is_current() {
            return;
        }
        let (tx, rx) = mpsc::sync_channel(1);
        self.dispatch(move || {
            let _ = tx.send(());
        });
        let _ = rx.recv();
    }

    /// Stop accepting work; the thread exits once its queue is empty
    pub fn shutdown(&self) {
        let sender = match self.inner.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if sender.is_some() {
            info!(name = %self.inner.name, "Callback context shut down");
        }
    }
}

impl std::fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackContext")
            .field("name", &self.inner.name)
            .finish()
    }
}
