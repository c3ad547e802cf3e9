// SPDX-License-Identifier: GPL-3.0-only

//! Camera session
//!
//! A [`Session`] is a cheap, clonable handle around:
//!
//! - the shared [`state::SharedState`] (filter, orientation frame, flash, zoom)
//! - the [`CaptureSerializer`] and the still [`PhotoPipeline`]
//! - the attached [`FrameProducer`] and the optional preview worker
//!
//! Capture results are delivered exactly once, either through a
//! [`CaptureTicket`] or on the session's single callback thread.
//! [`Session::dispose`] is idempotent, never waits on the hardware, and
//! fails every queued capture with `Disposed`.

pub mod commands;
pub mod state;

pub use commands::{CommandOutcome, SessionCommand, SettingsReport, reply};
pub use state::{SessionState, SharedState, StateSnapshot};

use crate::backends::camera::{
    CaptureSettings, DisplayableFrame, FocusPoint, FrameConsumer, FrameProducer, LensInfo, RawFrame, RawImage,
};
use crate::config::Config;
use crate::constants::ORIENTATION_EVENT_CAPACITY;
use crate::errors::{CameraError, CameraResult};
use crate::filters::{FilterCatalog, FilterDescriptor};
use crate::flash::FlashMode;
use crate::orientation::{OrientationEvent, OrientationSample, PlatformRotation, Rotation};
use crate::pipelines::capture::{
    Admission, CallbackContext, CaptureRequest, CaptureResult, CaptureSerializer, CaptureTicket,
};
use crate::pipelines::photo::{FinalizedCapture, PhotoCapture, PhotoPipeline, timestamped_path};
use crate::preview::{self, LiveFilterRenderer, PreviewStats, PreviewWorker};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct SessionInner {
    config: Config,
    catalog: Arc<FilterCatalog>,
    state: Arc<SharedState>,
    serializer: CaptureSerializer,
    pipeline: Arc<PhotoPipeline>,
    producer: Mutex<Option<Arc<dyn FrameProducer>>>,
    preview: Mutex<Option<PreviewWorker>>,
    /// Synchronous CPU renderer behind `corrected_frame`
    renderer: Mutex<LiveFilterRenderer>,
    events: broadcast::Sender<OrientationEvent>,
    callbacks: CallbackContext,
    runtime: Handle,
    disposed: AtomicBool,
}

/// Handle to a camera session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Session on the current tokio runtime with the built-in filters
    pub fn new(config: Config) -> CameraResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            CameraError::NotInitialized(format!("no async runtime for the session: {}", e))
        })?;
        Ok(Self::with_runtime(config, FilterCatalog::new(), runtime))
    }

    pub fn with_runtime(config: Config, catalog: FilterCatalog, runtime: Handle) -> Self {
        let catalog = Arc::new(catalog);
        let state = Arc::new(SharedState::new(SessionState::from_config(&config, &catalog)));
        let (events, _) = broadcast::channel(ORIENTATION_EVENT_CAPACITY);

        info!(
            renderer = ?config.renderer,
            quality = config.jpeg_quality.value(),
            lens = %config.initial_lens,
            "Camera session created"
        );

        Self {
            inner: Arc::new(SessionInner {
                pipeline: Arc::new(PhotoPipeline::new(Arc::clone(&catalog), config.jpeg_quality)),
                renderer: Mutex::new(LiveFilterRenderer::cpu(Arc::clone(&catalog))),
                catalog,
                state,
                serializer: CaptureSerializer::new(),
                producer: Mutex::new(None),
                preview: Mutex::new(None),
                events,
                callbacks: CallbackContext::new("camera-callbacks"),
                runtime,
                disposed: AtomicBool::new(false),
                config,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.inner.catalog
    }

    /// Context completion callbacks run on
    pub fn callback_context(&self) -> &CallbackContext {
        &self.inner.callbacks
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> CameraResult<()> {
        if self.is_disposed() {
            Err(CameraError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Attach the platform camera and select the configured lens
    pub fn attach_producer(&self, producer: Arc<dyn FrameProducer>) -> CameraResult<LensInfo> {
        self.ensure_active()?;

        let facing = self.inner.state.snapshot().orientation.lens_facing;
        let lens = producer.lens(facing).ok_or_else(|| {
            CameraError::DeviceUnavailable(format!("no {} camera on this device", facing))
        })?;

        self.inner.state.update(|state| {
            state.orientation = state.orientation.with_lens(lens.facing, lens.sensor_mount_angle);
            state.lens_id = Some(lens.id.clone());
            state.touch_preview();
        });

        if let Some(previous) = lock(&self.inner.producer).replace(producer) {
            debug!("Replacing attached frame producer");
            previous.release();
        }

        info!(
            lens = %lens.facing,
            id = %lens.id,
            sensor = lens.sensor_mount_angle.degrees(),
            "Frame producer attached"
        );
        Ok(lens)
    }

    fn producer(&self) -> CameraResult<Arc<dyn FrameProducer>> {
        lock(&self.inner.producer)
            .clone()
            .ok_or_else(|| CameraError::NotInitialized("no camera attached".to_string()))
    }

    /// Queue a capture; `path` defaults to a timestamped file in the photos
    /// directory. The ticket resolves exactly once.
    pub fn request_capture(&self, path: Option<PathBuf>) -> CaptureTicket {
        let (request, ticket) = CaptureRequest::new(self.target_path(path));
        self.submit(request);
        ticket
    }

    /// Queue a capture whose result is handed to `callback` on the session's
    /// callback thread
    pub fn request_capture_with<F>(&self, path: Option<PathBuf>, callback: F) -> Uuid
    where
        F: FnOnce(CaptureResult) + Send + 'static,
    {
        let request = CaptureRequest::with_callback(self.target_path(path), &self.inner.callbacks, callback);
        let id = request.id;
        self.submit(request);
        id
    }

    fn target_path(&self, path: Option<PathBuf>) -> PathBuf {
        path.unwrap_or_else(|| timestamped_path(&self.inner.config.photos_dir()))
    }

    fn submit(&self, request: CaptureRequest) {
        match self.inner.serializer.submit(request) {
            Admission::Start(request) => self.spawn_capture_loop(request),
            Admission::Queued { position } => debug!(position, "Capture waiting for the active one"),
            Admission::Rejected => {}
        }
    }

    /// Run captures back to back until the serializer's backlog is empty
    fn spawn_capture_loop(&self, first: CaptureRequest) {
        let session = self.clone();
        self.inner.runtime.spawn(async move {
            let mut next = Some(first);
            while let Some(request) = next {
                let (id, path, completion) = request.into_parts();
                info!(request = %id, path = %path.display(), "Capture started");

                // A panicking producer must not leave the serializer stuck in Capturing
                let result = match AssertUnwindSafe(session.capture_one(path)).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => Err(CameraError::CaptureFailed(format!(
                        "capture panicked: {}",
                        panic_message(panic.as_ref())
                    ))),
                };
                match &result {
                    Ok(path) => info!(request = %id, path = %path.display(), "Capture finished"),
                    Err(e) => warn!(request = %id, code = %e.code(), error = %e, "Capture failed"),
                }

                completion.resolve(result);
                next = session.inner.serializer.finish();
            }
        });
    }

    async fn capture_one(&self, path: PathBuf) -> CaptureResult {
        let producer = match self.producer() {
            Ok(producer) => producer,
            Err(_) if self.is_disposed() => return Err(CameraError::Disposed),
            Err(e) => return Err(e),
        };
        let snapshot = self.inner.state.snapshot();
        let physical = snapshot.orientation.physical_device_orientation;

        let settings = CaptureSettings {
            lens: snapshot.orientation.lens_facing,
            flash: snapshot.flash,
            zoom: snapshot.zoom,
            exposure: snapshot.exposure,
            focus_point: snapshot.focus_point,
            auto_focus: snapshot.auto_focus,
            target_rotation: PlatformRotation::from_physical_orientation(physical),
        };

        let raw = PhotoCapture::capture_from_producer(producer.as_ref(), &settings).await?;
        Arc::clone(&self.inner.pipeline)
            .finalize_and_save(raw, physical, snapshot.filter, path)
            .await
    }

    /// Select a filter by name. Unknown names are accepted and render as identity.
    pub fn set_filter(&self, name: &str) -> CameraResult<FilterDescriptor> {
        self.ensure_active()?;

        let canonical = match self.inner.catalog.canonical_name(name) {
            Some(canonical) => canonical,
            None => {
                debug!(filter = name, "Unknown filter, rendering as identity");
                name.to_string()
            }
        };

        let descriptor = self.inner.state.update(|state| {
            state.filter = FilterDescriptor::new(&canonical, state.filter.intensity());
            state.touch_preview();
            state.filter.clone()
        });
        info!(filter = descriptor.name(), "Filter selected");
        Ok(descriptor)
    }

    /// Set filter intensity, clamped to 0-1
    pub fn set_filter_intensity(&self, intensity: f32) -> CameraResult<f32> {
        self.ensure_active()?;
        if !intensity.is_finite() {
            return Err(CameraError::InvalidArgument(format!(
                "filter intensity must be a finite number, got {}",
                intensity
            )));
        }

        Ok(self.inner.state.update(|state| {
            state.filter = state.filter.clone().with_intensity(intensity);
            state.touch_preview();
            state.filter.intensity()
        }))
    }

    /// Feed a raw orientation reading (degrees, negative for unknown).
    /// Returns the physical quadrant in effect afterwards.
    pub fn set_physical_orientation(&self, degrees: i32) -> CameraResult<Rotation> {
        self.ensure_active()?;

        let (current, changed) = self.inner.state.update(|state| {
            let changed = state.tracker.observe(OrientationSample::from_raw(degrees));
            if let Some(quadrant) = changed {
                state.orientation = state.orientation.with_physical_orientation(quadrant);
            }
            (state.tracker.current(), changed.map(|_| state.orientation))
        });

        if let Some(frame) = changed {
            let event = OrientationEvent::new(frame.physical_device_orientation, frame.locked_ui_orientation);
            // No receivers is not an error
            let _ = self.inner.events.send(event);
        }
        Ok(current)
    }

    /// Switch between front and back lenses
    pub fn switch_camera(&self) -> CameraResult<LensInfo> {
        self.ensure_active()?;
        let producer = self.producer()?;

        let target = self.inner.state.snapshot().orientation.lens_facing.opposite();
        let lens = producer.lens(target).ok_or_else(|| {
            CameraError::DeviceUnavailable(format!("no {} camera on this device", target))
        })?;

        self.inner.state.update(|state| {
            state.orientation = state.orientation.with_lens(lens.facing, lens.sensor_mount_angle);
            state.lens_id = Some(lens.id.clone());
            state.touch_preview();
        });
        info!(lens = %lens.facing, id = %lens.id, "Camera switched");
        Ok(lens)
    }

    /// Cycle flash off, on, auto
    pub fn toggle_flash(&self) -> CameraResult<FlashMode> {
        self.ensure_active()?;
        let mode = self.inner.state.update(|state| {
            state.flash = state.flash.next();
            state.flash
        });
        debug!(flash = %mode, "Flash mode changed");
        Ok(mode)
    }

    /// Set linear zoom, clamped to 0-1
    pub fn set_zoom(&self, zoom: f32) -> CameraResult<f32> {
        self.ensure_active()?;
        if !zoom.is_finite() {
            return Err(CameraError::InvalidArgument(format!(
                "zoom must be a finite number, got {}",
                zoom
            )));
        }
        Ok(self.inner.state.update(|state| {
            state.zoom = state::clamp_zoom(zoom);
            state.zoom
        }))
    }

    /// Set exposure bias in EV, clamped to ±2
    pub fn set_exposure(&self, exposure: f32) -> CameraResult<f32> {
        self.ensure_active()?;
        if !exposure.is_finite() {
            return Err(CameraError::InvalidArgument(format!(
                "exposure must be a finite number, got {}",
                exposure
            )));
        }
        let exposure = self.inner.state.update(|state| {
            state.exposure = state::clamp_exposure(exposure);
            state.exposure
        });
        debug!(exposure, "Exposure bias changed");
        Ok(exposure)
    }

    /// Focus on a point in normalized frame coordinates
    pub fn set_focus_point(&self, x: f32, y: f32) -> CameraResult<FocusPoint> {
        self.ensure_active()?;
        let point = FocusPoint::new(x, y).ok_or_else(|| {
            CameraError::InvalidArgument(format!("focus point ({}, {}) is outside 0-1", x, y))
        })?;
        self.inner.state.update(|state| state.focus_point = Some(point));
        debug!(x, y, "Focus point set");
        Ok(point)
    }

    pub fn set_auto_focus(&self, enabled: bool) -> CameraResult<bool> {
        self.ensure_active()?;
        self.inner.state.update(|state| state.auto_focus = enabled);
        debug!(enabled, "Auto focus changed");
        Ok(enabled)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.state.snapshot()
    }

    pub fn settings(&self) -> CameraResult<SettingsReport> {
        self.ensure_active()?;
        let snapshot = self.inner.state.snapshot();
        Ok(SettingsReport {
            lens: snapshot.orientation.lens_facing,
            lens_id: snapshot.lens_id,
            zoom: snapshot.zoom,
            flash: snapshot.flash,
            exposure: snapshot.exposure,
            focus_point: snapshot.focus_point,
            auto_focus: snapshot.auto_focus,
            filter: snapshot.filter.name().to_string(),
            intensity: snapshot.filter.intensity(),
            sensor_mount_angle: snapshot.orientation.sensor_mount_angle.degrees(),
            physical_orientation: snapshot.orientation.physical_device_orientation.degrees(),
            ui_orientation: snapshot.orientation.locked_ui_orientation.degrees(),
        })
    }

    /// Orientation transitions, one event per quadrant change
    pub fn orientation_events(&self) -> broadcast::Receiver<OrientationEvent> {
        self.inner.events.subscribe()
    }

    /// Start the preview thread with the configured renderer strategy
    pub fn start_preview<C>(&self, consumer: C) -> CameraResult<()>
    where
        C: FrameConsumer + 'static,
    {
        self.ensure_active()?;

        let strategy = self.inner.config.renderer;
        let settings: Arc<dyn preview::PreviewSettingsSource> = self.inner.state.clone();
        let worker = PreviewWorker::start(
            Arc::clone(&self.inner.catalog),
            settings,
            move || preview::create_backend(strategy),
            consumer,
        )?;

        // Stop the old worker outside the lock; stopping joins its thread
        let previous = lock(&self.inner.preview).replace(worker);
        if let Some(previous) = previous {
            debug!("Previous preview worker replaced");
            previous.stop();
        }
        Ok(())
    }

    /// Hand a live frame to the preview worker. Returns its sequence number.
    pub fn submit_preview_frame(&self, frame: RawFrame) -> CameraResult<u64> {
        self.ensure_active()?;
        lock(&self.inner.preview)
            .as_ref()
            .map(|worker| worker.submit(frame))
            .ok_or_else(|| CameraError::NotInitialized("preview not started".to_string()))
    }

    pub fn preview_stats(&self) -> Option<PreviewStats> {
        lock(&self.inner.preview).as_ref().map(PreviewWorker::stats)
    }

    /// Correct and filter one frame synchronously on the calling thread
    pub fn corrected_frame(&self, frame: &RawFrame) -> CameraResult<DisplayableFrame> {
        self.ensure_active()?;
        let snapshot = self.inner.state.snapshot();
        let mut renderer = lock(&self.inner.renderer);
        renderer.set_filter(snapshot.filter);
        Ok(renderer.render_frame(frame, snapshot.orientation.locked_ui_orientation))
    }

    /// Correct, filter and encode a still without writing it. CPU-bound.
    pub fn finalized_capture(&self, raw: RawImage, path: Option<PathBuf>) -> CameraResult<FinalizedCapture> {
        self.ensure_active()?;
        let snapshot = self.inner.state.snapshot();
        self.inner.pipeline.finalize(
            raw,
            snapshot.orientation.physical_device_orientation,
            &snapshot.filter,
            self.target_path(path),
        )
    }

    /// Run a boundary command
    pub async fn execute(&self, command: SessionCommand) -> CameraResult<CommandOutcome> {
        debug!(method = command.method(), "Executing command");
        match command {
            SessionCommand::TakePicture { path } => {
                self.request_capture(path).await.map(CommandOutcome::Saved)
            }
            SessionCommand::SetFilter { filter_type } => {
                self.set_filter(&filter_type).map(|_| CommandOutcome::Done)
            }
            SessionCommand::SetFilterIntensity { intensity } => {
                self.set_filter_intensity(intensity).map(CommandOutcome::Value)
            }
            SessionCommand::SetZoom { zoom } => self.set_zoom(zoom).map(CommandOutcome::Value),
            SessionCommand::SetExposure { exposure } => {
                self.set_exposure(exposure).map(CommandOutcome::Value)
            }
            SessionCommand::SetFocusPoint { x, y } => {
                self.set_focus_point(x, y).map(CommandOutcome::Focus)
            }
            SessionCommand::SetAutoFocus { enabled } => {
                self.set_auto_focus(enabled).map(CommandOutcome::Flag)
            }
            SessionCommand::SwitchCamera => self.switch_camera().map(|lens| CommandOutcome::Lens(lens.facing)),
            SessionCommand::ToggleFlash => self.toggle_flash().map(CommandOutcome::Flash),
            SessionCommand::SetPhysicalOrientation { degrees } => self
                .set_physical_orientation(degrees)
                .map(|rotation| CommandOutcome::Orientation(rotation.degrees())),
            SessionCommand::GetSettings => self.settings().map(CommandOutcome::Settings),
            SessionCommand::Dispose => Ok(CommandOutcome::Disposed {
                drained: self.dispose(),
            }),
        }
    }

    /// Tear the session down. Safe from any thread, returns without waiting
    /// for an in-flight capture (whose result is still delivered). Returns
    /// how many queued captures were failed with `Disposed`.
    pub fn dispose(&self) -> usize {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            debug!("Session already disposed");
            return 0;
        }

        let drained = self.inner.serializer.dispose();

        let worker = lock(&self.inner.preview).take();
        if let Some(worker) = worker {
            worker.stop();
        }

        let producer = lock(&self.inner.producer).take();
        if let Some(producer) = producer {
            producer.release();
        }

        info!(drained, "Camera session disposed");
        drained
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("disposed", &self.is_disposed())
            .field("state", &self.inner.state.snapshot())
            .finish()
    }
}
