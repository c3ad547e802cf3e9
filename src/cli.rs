// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Processing an image file through the still capture pipeline
//! - Listing filters and the rotation table
//! - Driving a session with JSON commands over stdin/stdout

use beauty_camera::backends::virtual_camera::{FileFrameProducer, default_lenses};
use beauty_camera::filters::BuiltinFilter;
use beauty_camera::orientation::{LensFacing, Rotation, required_rotation};
use beauty_camera::session::{SessionCommand, reply};
use beauty_camera::{CameraError, Config, FilterCatalog, LensInfo, Session};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Arguments of the `process` command
pub struct ProcessOptions {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub lens: String,
    pub sensor_angle: Option<u32>,
    pub orientation: i32,
    pub filter: String,
    pub intensity: f32,
}

/// Lens table for a file producer, optionally overriding one sensor angle
fn lenses_for(facing: LensFacing, sensor_angle: Option<u32>) -> Result<Vec<LensInfo>, CameraError> {
    let mut lenses = default_lenses();
    if let Some(degrees) = sensor_angle {
        let angle = Rotation::try_from(degrees).map_err(CameraError::InvalidArgument)?;
        for lens in lenses.iter_mut().filter(|lens| lens.facing == facing) {
            lens.sensor_mount_angle = angle;
        }
    }
    Ok(lenses)
}

/// Run one image through a full session: attach, configure, capture, dispose
pub fn process_image(options: ProcessOptions) -> Result<(), Box<dyn std::error::Error>> {
    let facing: LensFacing = options.lens.parse()?;
    let lenses = lenses_for(facing, options.sensor_angle)?;

    let mut config = Config::load();
    config.initial_lens = facing;

    println!("Input: {}", options.input.display());

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let session = Session::new(config)?;
        let producer = Arc::new(FileFrameProducer::with_lenses(&options.input, lenses));
        let lens = session.attach_producer(producer)?;
        println!(
            "Lens: {} (id {}, sensor mounted at {})",
            lens.facing.as_str(),
            lens.id,
            lens.sensor_mount_angle
        );

        session.set_filter(&options.filter)?;
        let intensity = session.set_filter_intensity(options.intensity)?;
        let bucket = session.set_physical_orientation(options.orientation)?;
        println!("Filter: {} at {:.2}", session.snapshot().filter.name(), intensity);
        println!("Device orientation: {}", bucket);

        let start = Instant::now();
        let saved = session.request_capture(options.output.clone()).await;
        session.dispose();
        saved.map(|path| (path, start.elapsed()))
    });

    let (path, elapsed) = result?;
    println!("Processing time: {:.2}s", elapsed.as_secs_f64());
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// List catalog filters with their kind and accepted aliases
pub fn list_filters() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = FilterCatalog::new();

    println!("Available filters:");
    println!();
    for name in catalog.names() {
        let aliases = BuiltinFilter::from_name(name)
            .map(|f| f.aliases().iter().filter(|a| !a.is_empty()).copied().collect::<Vec<_>>())
            .unwrap_or_default();
        if aliases.is_empty() {
            println!("  {:<12} {}", name, catalog.kind_of(name).as_str());
        } else {
            println!(
                "  {:<12} {:<18} (also: {})",
                name,
                catalog.kind_of(name).as_str(),
                aliases.join(", ")
            );
        }
    }

    Ok(())
}

/// Print the clockwise rotation that makes a frame upright for every combination
pub fn print_rotations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{:<8} {:<6} {:>8} {:>8} {:>8} {:>8}", "sensor", "lens", "dev 0", "dev 90", "dev 180", "dev 270");
    for sensor in Rotation::ALL {
        for lens in [LensFacing::Back, LensFacing::Front] {
            let row: Vec<String> = Rotation::ALL
                .iter()
                .map(|device| format!("{:>8}", required_rotation(sensor, lens, *device).degrees()))
                .collect();
            println!("{:<8} {:<6} {}", sensor.degrees(), lens.as_str(), row.join(" "));
        }
    }
    Ok(())
}

/// Serve a session over stdin/stdout, one JSON command per line
///
/// Each line is `{"method": ..., "arguments": ...}`; each reply is
/// `{"ok": ...}` or `{"error": {"code", "message"}}`. The session is
/// disposed on EOF or after a `dispose` command.
pub fn run_channel(input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let session = Session::new(Config::load())?;
        session.attach_producer(Arc::new(FileFrameProducer::new(input)))?;

        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let command = serde_json::from_str::<serde_json::Value>(&line)
                .map_err(CameraError::from)
                .and_then(|call| SessionCommand::from_json(&call));
            let result = match command {
                Ok(command) => session.execute(command).await,
                Err(e) => Err(e),
            };

            writeln!(stdout, "{}", reply(&result))?;
            stdout.flush()?;

            if session.is_disposed() {
                break;
            }
        }

        session.dispose();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
