// SPDX-License-Identifier: GPL-3.0-only

//! User configuration, stored as JSON under the platform config directory

use crate::constants::{APP_DIR_NAME, JpegQuality};
use crate::errors::{CameraError, CameraResult};
use crate::filters::BuiltinFilter;
use crate::flash::FlashMode;
use crate::orientation::{LensFacing, Rotation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which filter backend the live preview uses
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererStrategy {
    /// GPU when an adapter is available, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl std::str::FromStr for RendererStrategy {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(CameraError::InvalidArgument(format!(
                "unknown renderer '{}' (expected auto, cpu or gpu)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JPEG quality preset for still captures
    pub jpeg_quality: JpegQuality,
    /// Lens selected when a session attaches
    pub initial_lens: LensFacing,
    pub initial_filter: String,
    pub initial_intensity: f32,
    /// Linear zoom, 0.0 to 1.0
    pub initial_zoom: f32,
    pub initial_flash: FlashMode,
    pub renderer: RendererStrategy,
    /// Extra degrees a reading must pass a quadrant boundary before the
    /// orientation bucket changes
    pub orientation_hysteresis_degrees: u32,
    /// Orientation the preview is pinned to
    pub locked_ui_orientation: Rotation,
    /// Overrides the default photos directory
    pub photos_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jpeg_quality: JpegQuality::default(),
            initial_lens: LensFacing::Back,
            initial_filter: BuiltinFilter::None.name().to_string(),
            initial_intensity: 1.0,
            initial_zoom: 0.0,
            initial_flash: FlashMode::Off,
            renderer: RendererStrategy::Auto,
            orientation_hysteresis_degrees: 0,
            locked_ui_orientation: Rotation::None,
            photos_dir: None,
        }
    }
}

impl Config {
    /// `<config dir>/beauty-camera/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.json"))
    }

    /// Load from the default path, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory on this platform, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or malformed file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default path
    pub fn save(&self) -> CameraResult<PathBuf> {
        let path = Self::default_path().ok_or_else(|| {
            CameraError::InvalidArgument("no config directory on this platform".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> CameraResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Directory captures are written to when the caller gives no path
    pub fn photos_dir(&self) -> PathBuf {
        if let Some(dir) = &self.photos_dir {
            return dir.clone();
        }
        dirs::picture_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(APP_DIR_NAME)
    }
}
