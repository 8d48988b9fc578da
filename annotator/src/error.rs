//! Pass-level error taxonomy.
//!
//! Every failure inside an analysis pass ends up as a [`PassError`] at the
//! lifecycle manager boundary, where it is logged, optionally surfaced as a
//! notice, and absorbed. None of them are fatal.

use crate::capture::CaptureError;
use crate::client::ClientError;

/// Stable machine-readable codes for error values.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Why an analysis or solution pass ended without rendering.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// The canvas was empty at capture time. Expected; not logged as an error.
    #[error("canvas has no content")]
    NoContent,

    /// Rasterization or encoding produced no image.
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// The tutor backend could not be reached or answered with garbage.
    #[error("transport failed: {0}")]
    TransportFailure(#[from] ClientError),

    /// Another pass already holds the canvas.
    #[error("another pass is in flight")]
    Busy,
}

impl ErrorCode for PassError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoContent => "E_NO_CONTENT",
            Self::CaptureFailure(_) => "E_CAPTURE_FAILURE",
            Self::TransportFailure(_) => "E_TRANSPORT_FAILURE",
            Self::Busy => "E_BUSY",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::CaptureFailure(_) | Self::Busy => true,
            Self::TransportFailure(e) => e.retryable(),
            Self::NoContent => false,
        }
    }
}

impl From<CaptureError> for PassError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::NoContent => Self::NoContent,
            other => Self::CaptureFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
