//! Structured session logging utilities.
//!
//! Every lifecycle line of a replayed session carries the same session id
//! and operation, so interleaved sessions can be told apart in JSON logs.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Session logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: String,
}

impl SessionLogger {
    /// Create a logger with a fresh random session id.
    pub fn new(operation: &str) -> Self {
        Self::from_string(&Uuid::new_v4().to_string(), operation)
    }

    /// Create a logger for an existing session id.
    pub fn from_string(session_id: &str, operation: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = %self.operation,
            "Session completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the session context, for attaching to spawned tasks.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = %self.operation
        )
    }
}
