// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "beauty-camera")]
#[command(about = "Orientation-correct filtered captures from image files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an image through the capture pipeline as if a sensor produced it
    Process {
        /// Input image (JPEG or PNG, as read off the sensor)
        #[arg(long)]
        input: PathBuf,

        /// Output file path (default: ~/Pictures/beauty-camera/IMG_TIMESTAMP.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lens that "took" the image: back or front
        #[arg(short, long, default_value = "back")]
        lens: String,

        /// Sensor mount angle in degrees (0, 90, 180, 270)
        #[arg(long)]
        sensor_angle: Option<u32>,

        /// Raw physical orientation reading in degrees (negative = unknown)
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        orientation: i32,

        /// Filter name (see 'beauty-camera filters')
        #[arg(short, long, default_value = "none")]
        filter: String,

        /// Filter intensity, 0.0 to 1.0
        #[arg(short, long, default_value = "1.0")]
        intensity: f32,
    },

    /// List available filters
    Filters,

    /// Print the required rotation for every sensor, lens and device orientation
    Rotations,

    /// Read JSON commands from stdin, one per line, and answer on stdout
    Channel {
        /// Image served as the camera frame
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=beauty_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            lens,
            sensor_angle,
            orientation,
            filter,
            intensity,
        } => cli::process_image(cli::ProcessOptions {
            input,
            output,
            lens,
            sensor_angle,
            orientation,
            filter,
            intensity,
        }),
        Commands::Filters => cli::list_filters(),
        Commands::Rotations => cli::print_rotations(),
        Commands::Channel { input } => cli::run_channel(input),
    }
}
