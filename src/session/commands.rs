// SPDX-License-Identifier: GPL-3.0-only

//! Typed command boundary
//!
//! Platform channels deliver `(method, arguments)` pairs with untyped JSON
//! arguments. They are turned into a [`SessionCommand`] here, so malformed
//! input fails with `InvalidArgument` before any session state is touched.

use crate::backends::camera::FocusPoint;
use crate::errors::{CameraError, CameraResult};
use crate::flash::FlashMode;
use crate::orientation::LensFacing;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// A validated session command
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// `path` defaults to a timestamped file in the photos directory
    TakePicture { path: Option<PathBuf> },
    SetFilter { filter_type: String },
    SetFilterIntensity { intensity: f32 },
    SetZoom { zoom: f32 },
    /// Exposure bias in EV
    SetExposure { exposure: f32 },
    /// Normalized coordinates, checked by the session
    SetFocusPoint { x: f32, y: f32 },
    SetAutoFocus { enabled: bool },
    SwitchCamera,
    ToggleFlash,
    /// Raw sensor degrees; negative means unknown
    SetPhysicalOrientation { degrees: i32 },
    GetSettings,
    Dispose,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakePictureArgs {
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetFilterArgs {
    filter_type: String,
}

#[derive(Deserialize)]
struct SetFilterIntensityArgs {
    intensity: f32,
}

#[derive(Deserialize)]
struct SetZoomArgs {
    zoom: f32,
}

#[derive(Deserialize)]
struct SetExposureArgs {
    exposure: f32,
}

#[derive(Deserialize)]
struct SetFocusPointArgs {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
struct SetAutoFocusArgs {
    enabled: bool,
}

#[derive(Deserialize)]
struct SetPhysicalOrientationArgs {
    degrees: i32,
}

fn parse_args<T: DeserializeOwned>(method: &str, arguments: Value) -> CameraResult<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| CameraError::InvalidArgument(format!("{}: {}", method, e)))
}

impl SessionCommand {
    /// Build a command from a channel call. `arguments` may be `null` for
    /// methods that take none.
    pub fn from_call(method: &str, arguments: Value) -> CameraResult<Self> {
        let command = match method {
            "takePicture" => {
                let args: TakePictureArgs = parse_args(method, arguments)?;
                SessionCommand::TakePicture {
                    path: args.path.filter(|p| !p.as_os_str().is_empty()),
                }
            }
            "setFilter" => {
                let args: SetFilterArgs = parse_args(method, arguments)?;
                SessionCommand::SetFilter {
                    filter_type: args.filter_type,
                }
            }
            "setFilterIntensity" => {
                let args: SetFilterIntensityArgs = parse_args(method, arguments)?;
                SessionCommand::SetFilterIntensity {
                    intensity: args.intensity,
                }
            }
            "setZoom" => {
                let args: SetZoomArgs = parse_args(method, arguments)?;
                SessionCommand::SetZoom { zoom: args.zoom }
            }
            "setExposure" => {
                let args: SetExposureArgs = parse_args(method, arguments)?;
                SessionCommand::SetExposure {
                    exposure: args.exposure,
                }
            }
            "setFocusPoint" => {
                let args: SetFocusPointArgs = parse_args(method, arguments)?;
                SessionCommand::SetFocusPoint { x: args.x, y: args.y }
            }
            "setAutoFocus" => {
                let args: SetAutoFocusArgs = parse_args(method, arguments)?;
                SessionCommand::SetAutoFocus {
                    enabled: args.enabled,
                }
            }
            "setPhysicalOrientation" => {
                let args: SetPhysicalOrientationArgs = parse_args(method, arguments)?;
                SessionCommand::SetPhysicalOrientation {
                    degrees: args.degrees,
                }
            }
            "switchCamera" => SessionCommand::SwitchCamera,
            "toggleFlash" => SessionCommand::ToggleFlash,
            "getSettings" => SessionCommand::GetSettings,
            "dispose" => SessionCommand::Dispose,
            other => {
                return Err(CameraError::InvalidArgument(format!(
                    "unknown method '{}'",
                    other
                )));
            }
        };
        Ok(command)
    }

    /// Build a command from `{"method": ..., "arguments": ...}`
    pub fn from_json(call: &Value) -> CameraResult<Self> {
        let method = call
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| CameraError::InvalidArgument("missing method".to_string()))?;
        let arguments = call.get("arguments").cloned().unwrap_or(Value::Null);
        Self::from_call(method, arguments)
    }

    pub fn method(&self) -> &'static str {
        match self {
            SessionCommand::TakePicture { .. } => "takePicture",
            SessionCommand::SetFilter { .. } => "setFilter",
            SessionCommand::SetFilterIntensity { .. } => "setFilterIntensity",
            SessionCommand::SetZoom { .. } => "setZoom",
            SessionCommand::SetExposure { .. } => "setExposure",
            SessionCommand::SetFocusPoint { .. } => "setFocusPoint",
            SessionCommand::SetAutoFocus { .. } => "setAutoFocus",
            SessionCommand::SwitchCamera => "switchCamera",
            SessionCommand::ToggleFlash => "toggleFlash",
            SessionCommand::SetPhysicalOrientation { .. } => "setPhysicalOrientation",
            SessionCommand::GetSettings => "getSettings",
            SessionCommand::Dispose => "dispose",
        }
    }
}

/// Current settings as reported to the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsReport {
    pub lens: LensFacing,
    pub lens_id: Option<String>,
    pub zoom: f32,
    pub flash: FlashMode,
    pub exposure: f32,
    pub focus_point: Option<FocusPoint>,
    pub auto_focus: bool,
    pub filter: String,
    pub intensity: f32,
    pub sensor_mount_angle: u32,
    pub physical_orientation: u32,
    pub ui_orientation: u32,
}

/// Successful result of a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutcome {
    Done,
    Saved(PathBuf),
    Flash(FlashMode),
    Value(f32),
    Flag(bool),
    Focus(FocusPoint),
    Orientation(u32),
    Lens(LensFacing),
    Settings(SettingsReport),
    Disposed { drained: usize },
}

/// JSON reply for a command result: `{"ok": ...}` or `{"error": {code, message}}`
pub fn reply(result: &CameraResult<CommandOutcome>) -> Value {
    match result {
        Ok(outcome) => serde_json::json!({ "ok": outcome }),
        Err(e) => serde_json::json!({ "error": e.report() }),
    }
}
