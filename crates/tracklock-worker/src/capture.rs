//! Capture source backed by recorded stills on disk.

use std::path::PathBuf;
use tracing::warn;
use tracklock_media::{Frame, FrameDecoder, TrackError, TrackResult};

/// Reads and decodes the frames of one recorded session.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    decoder: FrameDecoder,
    paths: Vec<PathBuf>,
}

impl CaptureSource {
    pub fn new(decoder: FrameDecoder, paths: Vec<PathBuf>) -> Self {
        Self { decoder, paths }
    }

    /// Frame files in capture order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Read and decode frame `index`.
    ///
    /// A missing or unreadable file is reported as `CaptureUnavailable`;
    /// undecodable bytes as `Decode`.
    pub async fn read(&self, index: usize) -> TrackResult<Frame> {
        let path = self.paths.get(index).ok_or(TrackError::CaptureUnavailable)?;
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Frame unreadable");
                return Err(TrackError::CaptureUnavailable);
            }
        };

        let decoder = self.decoder.clone();
        let sequence = index as u64;
        tokio::task::spawn_blocking(move || decoder.decode(&bytes, sequence))
            .await
            .map_err(|e| TrackError::backend(format!("decode task failed: {}", e)))?
    }
}
