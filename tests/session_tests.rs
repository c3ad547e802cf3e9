// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the camera session

use beauty_camera::backends::camera::{CaptureSettings, DisplayableFrame};
use beauty_camera::backends::virtual_camera::default_lenses;
use beauty_camera::session::{CommandOutcome, reply};
use beauty_camera::{
    CameraError, CameraResult, Config, ErrorCode, FlashMode, FrameProducer, LensFacing, LensInfo,
    RawFrame, RawImage, RendererStrategy, Rotation, Session, SessionCommand,
};
use futures::future::BoxFuture;
use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader, Rgba, RgbaImage};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Producer whose captures wait for a permit
struct GatedProducer {
    lenses: Vec<LensInfo>,
    gate: Semaphore,
    started: AtomicUsize,
    released: AtomicBool,
    settings: Mutex<Vec<CaptureSettings>>,
}

impl GatedProducer {
    fn new(open: bool) -> Arc<Self> {
        Self::with_lenses(open, default_lenses())
    }

    fn with_lenses(open: bool, lenses: Vec<LensInfo>) -> Arc<Self> {
        Arc::new(Self {
            lenses,
            gate: Semaphore::new(if open { Semaphore::MAX_PERMITS } else { 0 }),
            started: AtomicUsize::new(0),
            released: AtomicBool::new(false),
            settings: Mutex::new(Vec::new()),
        })
    }

    fn open(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

impl FrameProducer for GatedProducer {
    fn lenses(&self) -> Vec<LensInfo> {
        self.lenses.clone()
    }

    fn capture_still<'a>(&'a self, settings: &'a CaptureSettings) -> BoxFuture<'a, CameraResult<RawImage>> {
        Box::pin(async move {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.settings.lock().unwrap().push(*settings);
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| CameraError::CaptureFailed("gate closed".to_string()))?;
            permit.forget();

            let lens = self
                .lens(settings.lens)
                .ok_or_else(|| CameraError::DeviceUnavailable(settings.lens.to_string()))?;
            Ok(RawImage::from_pixels(landscape(), lens.sensor_mount_angle, lens.facing))
        })
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Producer whose first capture panics
struct PanicOnceProducer {
    panicked: AtomicBool,
}

impl FrameProducer for PanicOnceProducer {
    fn lenses(&self) -> Vec<LensInfo> {
        default_lenses()
    }

    fn capture_still<'a>(&'a self, settings: &'a CaptureSettings) -> BoxFuture<'a, CameraResult<RawImage>> {
        Box::pin(async move {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("sensor driver crashed");
            }
            let lens = self
                .lens(settings.lens)
                .ok_or_else(|| CameraError::DeviceUnavailable(settings.lens.to_string()))?;
            Ok(RawImage::from_pixels(landscape(), lens.sensor_mount_angle, lens.facing))
        })
    }
}

/// 64x32 sensor image
fn landscape() -> RgbaImage {
    RgbaImage::from_fn(64, 32, |x, _| Rgba([(x * 4) as u8, 80, 160, 255]))
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("beauty-camera-session-{}", uuid::Uuid::new_v4()))
}

fn test_config(dir: &PathBuf) -> Config {
    Config {
        renderer: RendererStrategy::Cpu,
        photos_dir: Some(dir.clone()),
        ..Config::default()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capture_without_producer_is_not_initialized() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    let err = session.request_capture(None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotInitialized);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capture_saves_upright_jpeg() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    let producer = GatedProducer::new(true);
    session.attach_producer(producer.clone()).unwrap();
    session.set_filter("sepia").unwrap();

    let path = session.request_capture(None).await.unwrap();
    assert!(path.starts_with(&dir));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

    // Back sensor mounted at 90 with the device upright: rotated to portrait
    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (32, 64));

    let mut decoder = ImageReader::open(&path)
        .unwrap()
        .with_guessed_format()
        .unwrap()
        .into_decoder()
        .unwrap();
    assert_eq!(decoder.orientation().unwrap(), Orientation::NoTransforms);

    session.dispose();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capture_uses_orientation_at_capture_start() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    let producer = GatedProducer::new(true);
    session.attach_producer(producer.clone()).unwrap();
    assert_eq!(session.set_physical_orientation(95).unwrap(), Rotation::Rotate90);

    let path = session.request_capture(Some(dir.join("tilted.jpg"))).await.unwrap();
    assert_eq!(path, dir.join("tilted.jpg"));

    // (90 - 90) mod 360 = 0: the landscape sensor image is already upright
    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (64, 32));

    let settings = producer.settings.lock().unwrap()[0];
    assert_eq!(settings.target_rotation.degrees(), 270);

    session.dispose();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_five_captures_resolve_in_order() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    let producer = GatedProducer::new(false);
    session.attach_producer(producer.clone()).unwrap();

    let (tx, rx) = mpsc::channel();
    let mut ids = Vec::new();
    for i in 0..5 {
        let tx = tx.clone();
        let path = dir.join(format!("{}.jpg", i));
        ids.push(session.request_capture_with(Some(path), move |result| {
            let _ = tx.send((i, result));
        }));
    }

    // Only one capture reaches the producer at a time
    wait_until(|| producer.started.load(Ordering::SeqCst) == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(producer.started.load(Ordering::SeqCst), 1);

    producer.open(5);
    let results = tokio::task::spawn_blocking(move || {
        (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
            .collect::<Vec<_>>()
    })
    .await
    .unwrap();

    for (expected, (i, result)) in results.into_iter().enumerate() {
        assert_eq!(i, expected);
        assert_eq!(result.unwrap(), dir.join(format!("{}.jpg", i)));
    }
    assert_eq!(producer.started.load(Ordering::SeqCst), 5);
    assert_eq!(ids.len(), 5);

    session.dispose();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_capture_fails_and_queue_keeps_moving() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    session
        .attach_producer(Arc::new(PanicOnceProducer {
            panicked: AtomicBool::new(false),
        }))
        .unwrap();

    let crashed = session.request_capture(Some(dir.join("crashed.jpg")));
    let queued = session.request_capture(Some(dir.join("queued.jpg")));

    let err = tokio::time::timeout(Duration::from_secs(5), crashed)
        .await
        .expect("crashed capture never resolved")
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CaptureFailed);
    assert!(err.to_string().contains("sensor driver crashed"), "{}", err);

    let saved = tokio::time::timeout(Duration::from_secs(5), queued)
        .await
        .expect("queued capture never resolved")
        .unwrap();
    assert_eq!(saved, dir.join("queued.jpg"));

    // The serializer is idle again, so a fresh request starts right away
    let later = tokio::time::timeout(Duration::from_secs(5), session.request_capture(Some(dir.join("later.jpg"))))
        .await
        .expect("capture after the panic never resolved");
    assert_eq!(later.unwrap(), dir.join("later.jpg"));

    session.dispose();
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispose_fails_pending_and_lets_active_finish() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    let producer = GatedProducer::new(false);
    session.attach_producer(producer.clone()).unwrap();

    let active = session.request_capture(Some(dir.join("active.jpg")));
    let pending: Vec<_> = (0..3)
        .map(|i| session.request_capture(Some(dir.join(format!("pending-{}.jpg", i)))))
        .collect();
    wait_until(|| producer.started.load(Ordering::SeqCst) == 1).await;

    assert_eq!(session.dispose(), 3);
    assert_eq!(session.dispose(), 0);
    assert!(producer.released.load(Ordering::SeqCst));

    for ticket in pending {
        assert_eq!(ticket.await, Err(CameraError::Disposed));
    }

    producer.open(1);
    assert_eq!(active.await.unwrap(), dir.join("active.jpg"));
    assert_eq!(producer.started.load(Ordering::SeqCst), 1);

    // Everything after dispose is refused
    assert_eq!(session.request_capture(None).await, Err(CameraError::Disposed));
    assert_eq!(session.set_filter("sepia"), Err(CameraError::Disposed));
    assert_eq!(session.set_zoom(0.5), Err(CameraError::Disposed));
    assert_eq!(session.set_physical_orientation(90), Err(CameraError::Disposed));
    assert_eq!(session.settings(), Err(CameraError::Disposed));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_orientation_events_only_on_transitions() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    let mut events = session.orientation_events();

    session.set_physical_orientation(10).unwrap();
    assert!(events.try_recv().is_err());

    assert_eq!(session.set_physical_orientation(95).unwrap(), Rotation::Rotate90);
    let event = events.try_recv().unwrap();
    assert_eq!(event.device_orientation, 90);
    assert_eq!(event.ui_orientation, 0);

    assert_eq!(session.set_physical_orientation(120).unwrap(), Rotation::Rotate90);
    assert_eq!(session.set_physical_orientation(-1).unwrap(), Rotation::Rotate90);
    assert!(events.try_recv().is_err());

    assert_eq!(session.set_physical_orientation(270).unwrap(), Rotation::Rotate270);
    assert_eq!(events.try_recv().unwrap().device_orientation, 270);
    session.dispose();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_switch_camera_updates_settings() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    assert_eq!(
        session.switch_camera().unwrap_err().code(),
        ErrorCode::NotInitialized
    );

    session.attach_producer(GatedProducer::new(true)).unwrap();
    let settings = session.settings().unwrap();
    assert_eq!(settings.lens, LensFacing::Back);
    assert_eq!(settings.sensor_mount_angle, 90);
    assert_eq!(settings.lens_id.as_deref(), Some("0"));

    let lens = session.switch_camera().unwrap();
    assert_eq!(lens.facing, LensFacing::Front);
    let settings = session.settings().unwrap();
    assert_eq!(settings.lens, LensFacing::Front);
    assert_eq!(settings.sensor_mount_angle, 270);
    session.dispose();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_lens_is_device_unavailable() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    let back_only: Vec<LensInfo> = default_lenses()
        .into_iter()
        .filter(|lens| lens.facing == LensFacing::Back)
        .collect();
    session
        .attach_producer(GatedProducer::with_lenses(true, back_only.clone()))
        .unwrap();
    assert_eq!(
        session.switch_camera().unwrap_err().code(),
        ErrorCode::DeviceUnavailable
    );

    let front_session = Session::new(Config {
        initial_lens: LensFacing::Front,
        ..test_config(&temp_dir())
    })
    .unwrap();
    assert_eq!(
        front_session
            .attach_producer(GatedProducer::with_lenses(true, back_only))
            .unwrap_err()
            .code(),
        ErrorCode::DeviceUnavailable
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_values_are_rejected_or_clamped() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    assert_eq!(session.set_filter_intensity(4.0).unwrap(), 1.0);
    assert_eq!(session.set_filter_intensity(-0.5).unwrap(), 0.0);
    assert_eq!(
        session.set_filter_intensity(f32::NAN).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );
    assert_eq!(session.set_zoom(7.0).unwrap(), 1.0);
    assert_eq!(
        session.set_zoom(f32::INFINITY).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );

    // Unknown filters are accepted and behave as identity
    let descriptor = session.set_filter("Polaroid").unwrap();
    assert_eq!(descriptor.name(), "polaroid");
    assert_eq!(session.set_filter("Grayscale").unwrap().name(), "mono");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exposure_and_focus_reach_the_producer() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    let producer = GatedProducer::new(true);
    session.attach_producer(producer.clone()).unwrap();

    let settings = session.settings().unwrap();
    assert_eq!(settings.exposure, 0.0);
    assert_eq!(settings.focus_point, None);
    assert!(settings.auto_focus);

    assert_eq!(session.set_exposure(3.5).unwrap(), 2.0);
    assert_eq!(session.set_exposure(-9.0).unwrap(), -2.0);
    assert_eq!(session.set_exposure(0.5).unwrap(), 0.5);
    assert_eq!(
        session.set_exposure(f32::NAN).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );

    for (x, y) in [(1.2, 0.5), (0.5, -0.1), (f32::NAN, 0.5)] {
        assert_eq!(
            session.set_focus_point(x, y).unwrap_err().code(),
            ErrorCode::InvalidArgument,
            "({}, {})",
            x,
            y
        );
    }
    let point = session.set_focus_point(0.25, 1.0).unwrap();
    assert_eq!((point.x, point.y), (0.25, 1.0));
    assert!(!session.set_auto_focus(false).unwrap());

    let outcome = session
        .execute(SessionCommand::from_call("setExposure", json!({"exposure": -0.75})).unwrap())
        .await;
    assert_eq!(reply(&outcome), json!({"ok": -0.75}));

    let report = reply(&session.execute(SessionCommand::GetSettings).await);
    assert_eq!(report["ok"]["exposure"], json!(-0.75));
    assert_eq!(report["ok"]["focusPoint"], json!({"x": 0.25, "y": 1.0}));
    assert_eq!(report["ok"]["autoFocus"], json!(false));

    session.request_capture(Some(dir.join("tuned.jpg"))).await.unwrap();
    let passed = producer.settings.lock().unwrap()[0];
    assert_eq!(passed.exposure, -0.75);
    assert_eq!(passed.focus_point.map(|p| (p.x, p.y)), Some((0.25, 1.0)));
    assert!(!passed.auto_focus);

    session.dispose();
    assert_eq!(session.set_exposure(0.0), Err(CameraError::Disposed));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_commands() {
    let dir = temp_dir();
    let session = Session::new(test_config(&dir)).unwrap();
    session.attach_producer(GatedProducer::new(true)).unwrap();

    let outcome = session
        .execute(SessionCommand::from_call("toggleFlash", serde_json::Value::Null).unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Flash(FlashMode::On));

    let outcome = session
        .execute(SessionCommand::from_call("setFilterIntensity", json!({"intensity": 0.25})).unwrap())
        .await;
    assert_eq!(reply(&outcome), json!({"ok": 0.25}));

    let outcome = session
        .execute(SessionCommand::from_call("getSettings", serde_json::Value::Null).unwrap())
        .await;
    let value = reply(&outcome);
    assert_eq!(value["ok"]["flash"], json!("on"));
    assert_eq!(value["ok"]["intensity"], json!(0.25));
    assert_eq!(value["ok"]["sensorMountAngle"], json!(90));

    let saved = session
        .execute(SessionCommand::TakePicture {
            path: Some(dir.join("cmd.jpg")),
        })
        .await
        .unwrap();
    assert_eq!(saved, CommandOutcome::Saved(dir.join("cmd.jpg")));

    let disposed = session.execute(SessionCommand::Dispose).await.unwrap();
    assert_eq!(disposed, CommandOutcome::Disposed { drained: 0 });

    let refused = session.execute(SessionCommand::GetSettings).await;
    assert_eq!(reply(&refused)["error"]["code"], json!("DISPOSED"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_frames_are_corrected_and_ordered() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    session.attach_producer(GatedProducer::new(true)).unwrap();
    session.set_filter("negative").unwrap();

    let (tx, rx) = mpsc::channel::<DisplayableFrame>();
    session
        .start_preview(move |frame: DisplayableFrame| {
            let _ = tx.send(frame);
        })
        .unwrap();

    let mut last = 0;
    for _ in 0..10 {
        let frame = RawFrame::new(landscape(), Rotation::Rotate90, LensFacing::Back);
        last = session.submit_preview_frame(frame).unwrap();
    }

    let frames = tokio::task::spawn_blocking(move || {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.recv_timeout(Duration::from_secs(5)) {
            let done = frame.sequence == last;
            frames.push(frame);
            if done {
                break;
            }
        }
        frames
    })
    .await
    .unwrap();

    assert!(!frames.is_empty());
    assert_eq!(frames.last().map(|f| f.sequence), Some(last));
    for pair in frames.windows(2) {
        assert!(pair[0].sequence < pair[1].sequence);
    }
    for frame in &frames {
        assert_eq!(frame.rotation, Rotation::Rotate90);
        assert_eq!((frame.width(), frame.height()), (32, 64));
        assert_eq!(frame.filter, "negative");
    }

    let stats = session.preview_stats().unwrap();
    assert_eq!(stats.submitted, 10);
    assert_eq!(stats.presented + stats.dropped, 10);
    session.dispose();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_replacing_preview_does_not_block_other_callers() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    session.attach_producer(GatedProducer::new(true)).unwrap();

    // First consumer parks inside present() until released
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    session
        .start_preview(move |_frame: DisplayableFrame| {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
        })
        .unwrap();
    session
        .submit_preview_frame(RawFrame::new(landscape(), Rotation::Rotate90, LensFacing::Back))
        .unwrap();
    tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .await
        .unwrap();

    // Replacing joins the parked render thread
    let (frames_tx, frames_rx) = mpsc::channel::<DisplayableFrame>();
    let replacing = {
        let session = session.clone();
        tokio::task::spawn_blocking(move || {
            session.start_preview(move |frame: DisplayableFrame| {
                let _ = frames_tx.send(frame);
            })
        })
    };

    // The new worker is reachable while the old one is still stopping
    let observer = session.clone();
    let installed = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::task::spawn_blocking(move || {
            loop {
                if observer.preview_stats().map(|s| s.submitted) == Some(0) {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }),
    )
    .await
    .expect("preview lock held while the old worker was joined")
    .unwrap();
    assert!(installed);

    release_tx.send(()).unwrap();
    replacing.await.unwrap().unwrap();

    let sequence = session
        .submit_preview_frame(RawFrame::new(landscape(), Rotation::Rotate90, LensFacing::Back))
        .unwrap();
    let frame = tokio::task::spawn_blocking(move || frames_rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .await
        .unwrap();
    assert_eq!(frame.sequence, sequence);
    session.dispose();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrected_frame_matches_capture_rotation() {
    let session = Session::new(test_config(&temp_dir())).unwrap();
    let frame = RawFrame::new(landscape(), Rotation::Rotate270, LensFacing::Front);
    let displayable = session.corrected_frame(&frame).unwrap();
    assert_eq!(displayable.rotation, Rotation::Rotate270);
    assert_eq!((displayable.width(), displayable.height()), (32, 64));
    assert!(displayable.filtered);
}
