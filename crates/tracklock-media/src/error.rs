//! Error types for tracking operations.

use thiserror::Error;

/// Result type for tracking operations.
pub type TrackResult<T> = Result<T, TrackError>;

/// Errors that can occur while mapping, decoding or tracking.
///
/// None of these is fatal: every kind is recovered either by returning the
/// session to idle or by waiting for the next frame.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Tracker initialization failed: {0}")]
    TrackInitFailed(String),

    #[error("Target lost")]
    TrackLost,

    #[error("No frame available")]
    CaptureUnavailable,

    #[error("Frame decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Tracker backend error: {0}")]
    Backend(String),
}

impl TrackError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }

    /// Create a tracker initialization failure.
    pub fn init_failed(message: impl Into<String>) -> Self {
        Self::TrackInitFailed(message.into())
    }

    /// Create a tracker backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackError::InvalidGeometry(_) => "invalid_geometry",
            TrackError::TrackInitFailed(_) => "track_init_failed",
            TrackError::TrackLost => "track_lost",
            TrackError::CaptureUnavailable => "capture_unavailable",
            TrackError::Decode(_) => "decode",
            TrackError::Backend(_) => "backend",
        }
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for TrackError {
    fn from(e: opencv::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
