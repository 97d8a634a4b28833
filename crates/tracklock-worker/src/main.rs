//! Session replay worker binary.
//!
//! Usage: `tracklock-worker <manifest.json>`

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracklock_worker::metrics::init_metrics;
use tracklock_worker::{SessionManifest, SessionRunner, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracklock=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let Some(manifest_path) = std::env::args().nth(1) else {
        eprintln!("usage: tracklock-worker <manifest.json>");
        std::process::exit(2);
    };

    info!("Starting tracklock-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let metrics_handle = if config.metrics_enabled {
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to install metrics recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let manifest = match SessionManifest::load(&manifest_path).await {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to load manifest {}: {}", manifest_path, e);
            std::process::exit(1);
        }
    };

    let runner = match SessionRunner::new(config, manifest) {
        Ok(r) => r,
        Err(e) => {
            error!("Failed to create session runner: {}", e);
            std::process::exit(1);
        }
    };

    let report = match runner.run().await {
        Ok(report) => report,
        Err(e) => {
            error!("Session replay failed: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize session report: {}", e),
    }

    if let Some(handle) = metrics_handle {
        info!("Metrics snapshot:\n{}", handle.render());
    }

    info!("Worker shutdown complete");
}
