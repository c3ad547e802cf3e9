// SPDX-License-Identifier: GPL-3.0-only

//! Error taxonomy shared by every camera operation
//!
//! Each variant maps to a stable [`ErrorCode`] so callers on the other side of
//! the plugin boundary can branch on the code rather than parse messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Errors surfaced by the session and its pipelines
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// No frame producer is attached to the session
    NotInitialized(String),
    /// No camera matches the request (e.g. no front lens)
    DeviceUnavailable(String),
    /// Hardware-level capture error, or the result could not be persisted
    CaptureFailed(String),
    /// Decode or processing error while applying a filter
    FilterFailed(String),
    /// The session was torn down before the operation could run
    Disposed,
    /// Missing or malformed request parameters
    InvalidArgument(String),
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotInitialized,
    DeviceUnavailable,
    CaptureFailed,
    FilterFailed,
    Disposed,
    InvalidArgument,
}

impl ErrorCode {
    /// String form of the code, identical to its serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotInitialized => "NOT_INITIALIZED",
            ErrorCode::DeviceUnavailable => "DEVICE_UNAVAILABLE",
            ErrorCode::CaptureFailed => "CAPTURE_FAILED",
            ErrorCode::FilterFailed => "FILTER_FAILED",
            ErrorCode::Disposed => "DISPOSED",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CameraError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CameraError::NotInitialized(_) => ErrorCode::NotInitialized,
            CameraError::DeviceUnavailable(_) => ErrorCode::DeviceUnavailable,
            CameraError::CaptureFailed(_) => ErrorCode::CaptureFailed,
            CameraError::FilterFailed(_) => ErrorCode::FilterFailed,
            CameraError::Disposed => ErrorCode::Disposed,
            CameraError::InvalidArgument(_) => ErrorCode::InvalidArgument,
        }
    }

    /// Serializable form delivered across the plugin boundary
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NotInitialized(msg) => write!(f, "Camera not initialized: {}", msg),
            CameraError::DeviceUnavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            CameraError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            CameraError::FilterFailed(msg) => write!(f, "Filter failed: {}", msg),
            CameraError::Disposed => write!(f, "Camera disposed while request was pending"),
            CameraError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::CaptureFailed(err.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::FilterFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CameraError {
    fn from(err: serde_json::Error) -> Self {
        CameraError::InvalidArgument(err.to_string())
    }
}

/// Error payload as seen by boundary callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(CameraError::Disposed.code().as_str(), "DISPOSED");
        assert_eq!(
            CameraError::InvalidArgument("x".into()).code(),
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::DeviceUnavailable).unwrap(),
            "\"DEVICE_UNAVAILABLE\""
        );
    }

    #[test]
    fn test_report_carries_message() {
        let report = CameraError::CaptureFailed("shutter jammed".into()).report();
        assert_eq!(report.code, ErrorCode::CaptureFailed);
        assert!(report.message.contains("shutter jammed"));
    }

    #[test]
    fn test_io_error_maps_to_capture_failed() {
        let err: CameraError = std::io::Error::other("disk full").into();
        assert_eq!(err.code(), ErrorCode::CaptureFailed);
    }
}
