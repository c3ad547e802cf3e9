// SPDX-License-Identifier: GPL-3.0-only

//! Preview rendering thread
//!
//! Frames go through a single-slot mailbox: a frame that is still waiting
//! when a newer one arrives is dropped. One thread owns the renderer (and so
//! the GPU context), which keeps presentation in sequence order.
//!
//! Each frame is rendered against a settings snapshot. If the settings
//! generation moved while the frame was rendering, the frame is rendered
//! again; after [`PREVIEW_STALE_RETRIES`] attempts it is dropped rather than
//! presented with a superseded filter.

use super::{FilterBackend, LiveFilterRenderer};
use crate::backends::camera::{DisplayableFrame, FrameConsumer, RawFrame};
use crate::constants::PREVIEW_STALE_RETRIES;
use crate::errors::{CameraError, CameraResult};
use crate::filters::{FilterCatalog, FilterDescriptor};
use crate::orientation::Rotation;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// What the renderer needs to know about the session for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSettings {
    pub filter: FilterDescriptor,
    pub ui_orientation: Rotation,
    /// Bumped on every filter change
    pub generation: u64,
}

/// Source of the current preview settings, read once per render attempt
pub trait PreviewSettingsSource: Send + Sync + 'static {
    fn preview_settings(&self) -> PreviewSettings;
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewStats {
    pub submitted: u64,
    pub presented: u64,
    /// Replaced in the mailbox, or dropped as stale
    pub dropped: u64,
}

#[derive(Default)]
struct Mailbox {
    frame: Option<RawFrame>,
    stopped: bool,
}

#[derive(Default)]
struct Shared {
    mailbox: Mutex<Mailbox>,
    ready: Condvar,
    next_sequence: AtomicU64,
    presented: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        match self.mailbox.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Block until a frame is available; `None` once stopped
    fn next_frame(&self) -> Option<RawFrame> {
        let mut mailbox = self.lock();
        loop {
            if mailbox.stopped {
                return None;
            }
            if let Some(frame) = mailbox.frame.take() {
                return Some(frame);
            }
            mailbox = match self.ready.wait(mailbox) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// Owns the preview thread
pub struct PreviewWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl PreviewWorker {
    /// Spawn the preview thread.
    ///
    /// `backend` runs on the new thread, so a GPU context is created and used
    /// there only.
    pub fn start<B, C>(
        catalog: Arc<FilterCatalog>,
        settings: Arc<dyn PreviewSettingsSource>,
        backend: B,
        mut consumer: C,
    ) -> CameraResult<Self>
    where
        B: FnOnce() -> Box<dyn FilterBackend> + Send + 'static,
        C: FrameConsumer + 'static,
    {
        let shared = Arc::new(Shared::default());
        let thread_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("preview-render".to_string())
            .spawn(move || {
                let mut renderer = LiveFilterRenderer::new(catalog, backend());
                info!(backend = renderer.backend_name(), "Preview thread started");
                let mut last_presented: Option<u64> = None;

                while let Some(frame) = thread_shared.next_frame() {
                    if last_presented.is_some_and(|last| frame.sequence <= last) {
                        thread_shared.dropped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }

                    match render_current(&mut renderer, settings.as_ref(), &frame) {
                        Some(displayable) => {
                            last_presented = Some(displayable.sequence);
                            thread_shared.presented.fetch_add(1, Ordering::Relaxed);
                            consumer.present(displayable);
                        }
                        None => {
                            debug!(sequence = frame.sequence, "Dropping frame, filter kept changing");
                            thread_shared.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }

                info!("Preview thread exiting");
            })
            .map_err(|e| CameraError::DeviceUnavailable(format!("cannot start preview thread: {}", e)))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Hand a frame to the renderer, replacing any frame still waiting.
    /// Returns the sequence number assigned to it.
    pub fn submit(&self, mut frame: RawFrame) -> u64 {
        let sequence = self.shared.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        frame.sequence = sequence;

        let replaced = {
            let mut mailbox = self.shared.lock();
            if mailbox.stopped {
                return sequence;
            }
            mailbox.frame.replace(frame)
        };

        if let Some(old) = replaced {
            debug!(sequence = old.sequence, "Preview frame superseded before rendering");
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.ready.notify_one();
        sequence
    }

    pub fn stats(&self) -> PreviewStats {
        PreviewStats {
            submitted: self.shared.next_sequence.load(Ordering::Relaxed),
            presented: self.shared.presented.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop the thread after the frame in progress. Waiting frames are discarded.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        {
            let mut mailbox = self.shared.lock();
            mailbox.stopped = true;
            mailbox.frame = None;
        }
        self.shared.ready.notify_all();

        if let Some(handle) = self.handle.take() {
            // The consumer may tear the session down from the preview thread itself
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Preview thread panicked");
            }
        }
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Render `frame` against the latest settings; `None` if they never settled
fn render_current(
    renderer: &mut LiveFilterRenderer,
    source: &dyn PreviewSettingsSource,
    frame: &RawFrame,
) -> Option<DisplayableFrame> {
    for _ in 0..=PREVIEW_STALE_RETRIES {
        let settings = source.preview_settings();
        renderer.set_filter(settings.filter.clone());
        let displayable = renderer.render_frame(frame, settings.ui_orientation);

        if source.preview_settings().generation == settings.generation {
            return Some(displayable);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::LensFacing;
    use crate::preview::CpuFilterBackend;
    use image::{Rgba, RgbaImage};
    use std::sync::mpsc;
    use std::time::Duration;

    struct FixedSettings(Mutex<PreviewSettings>);

    impl PreviewSettingsSource for FixedSettings {
        fn preview_settings(&self) -> PreviewSettings {
            self.0.lock().unwrap().clone()
        }
    }

    /// Bumps the generation on every read, so no render ever settles
    struct RestlessSettings(AtomicU64);

    impl PreviewSettingsSource for RestlessSettings {
        fn preview_settings(&self) -> PreviewSettings {
            PreviewSettings {
                filter: FilterDescriptor::new("sepia", 1.0),
                ui_orientation: Rotation::None,
                generation: self.0.fetch_add(1, Ordering::SeqCst),
            }
        }
    }

    fn frame(value: u8) -> RawFrame {
        RawFrame::new(
            RgbaImage::from_pixel(6, 4, Rgba([value, value, value, 255])),
            Rotation::Rotate90,
            LensFacing::Back,
        )
    }

    fn settings(filter: &str) -> Arc<FixedSettings> {
        Arc::new(FixedSettings(Mutex::new(PreviewSettings {
            filter: FilterDescriptor::new(filter, 1.0),
            ui_orientation: Rotation::None,
            generation: 0,
        })))
    }

    fn cpu() -> Box<dyn FilterBackend> {
        Box::new(CpuFilterBackend)
    }

    #[test]
    fn test_frames_presented_in_order() {
        let (tx, rx) = mpsc::channel::<DisplayableFrame>();
        let worker = PreviewWorker::start(
            Arc::new(FilterCatalog::new()),
            settings("negative"),
            cpu,
            move |frame: DisplayableFrame| {
                let _ = tx.send(frame);
            },
        )
        .unwrap();

        for i in 0..50u8 {
            worker.submit(frame(i));
        }

        let mut last = 0;
        while let Ok(out) = rx.recv_timeout(Duration::from_millis(500)) {
            assert!(out.sequence > last, "{} after {}", out.sequence, last);
            last = out.sequence;
            assert_eq!(out.filter, "negative");
            if out.sequence == 50 {
                break;
            }
        }
        assert_eq!(last, 50, "latest frame must be presented");

        let stats = worker.stats();
        assert_eq!(stats.submitted, 50);
        assert_eq!(stats.presented + stats.dropped, 50);
        worker.stop();
    }

    #[test]
    fn test_unsettled_filter_drops_frame() {
        let (tx, rx) = mpsc::channel::<DisplayableFrame>();
        let worker = PreviewWorker::start(
            Arc::new(FilterCatalog::new()),
            Arc::new(RestlessSettings(AtomicU64::new(0))),
            cpu,
            move |frame: DisplayableFrame| {
                let _ = tx.send(frame);
            },
        )
        .unwrap();

        worker.submit(frame(10));
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(worker.stats().dropped, 1);
        worker.stop();
    }

    #[test]
    fn test_presented_frame_uses_current_filter() {
        let (tx, rx) = mpsc::channel::<DisplayableFrame>();
        let source = settings("none");
        let worker = PreviewWorker::start(
            Arc::new(FilterCatalog::new()),
            source.clone(),
            cpu,
            move |frame: DisplayableFrame| {
                let _ = tx.send(frame);
            },
        )
        .unwrap();

        worker.submit(frame(10));
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.filter, "none");

        {
            let mut current = source.0.lock().unwrap();
            current.filter = FilterDescriptor::new("mono", 1.0);
            current.generation += 1;
        }
        worker.submit(frame(10));
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(second.filter, "mono");
        assert!(second.sequence > first.sequence);
        worker.stop();
    }

    #[test]
    fn test_submit_after_stop_is_ignored() {
        let worker = PreviewWorker::start(
            Arc::new(FilterCatalog::new()),
            settings("none"),
            cpu,
            |_frame: DisplayableFrame| {},
        )
        .unwrap();
        worker.shared.lock().stopped = true;
        worker.submit(frame(1));
        assert!(worker.shared.lock().frame.is_none());
    }
}
