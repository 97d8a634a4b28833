//! Session replay worker.
//!
//! This crate provides:
//! - Environment-driven worker configuration
//! - Recorded session manifests and a disk-backed capture source
//! - Concurrent capture/input/processing replay through the tracking pipeline
//! - Structured session logging and a Prometheus recorder

pub mod capture;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod runner;

pub use capture::CaptureSource;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::SessionLogger;
pub use manifest::{SessionManifest, TimedEvent};
pub use runner::{SessionReport, SessionRunner};
