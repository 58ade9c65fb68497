//! Graceful-drain HTTP service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request           ┌──────────────────────────────────────────────┐
//!     ─────────────────────────┼─▶ net::listener ──▶ http::server ──▶ pool   │
//!                              │   (pause gate)      (axum routes)   (drain)  │
//!                              │                                              │
//!     SIGTERM / SIGINT         │   lifecycle::signals ──▶ lifecycle::hooks    │
//!     ─────────────────────────┼─▶ (closing, interrupt)   └▶ coordinator      │
//!                              │                            pause → drain     │
//!                              └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use graceful_drain::config::{read_config, validate_config, ConfigError, ServiceConfig};
use graceful_drain::http::demo;
use graceful_drain::lifecycle::{listen_for_signals, Application, ProcessSignals};
use graceful_drain::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "graceful-drain", version, about = "HTTP service with graceful shutdown")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application name. Required unless the config file sets it.
    #[arg(short, long)]
    name: Option<String>,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(name) = args.name {
        config.application_name = name;
    }
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }
    // Validated after overrides so `--name` can supply a missing name.
    if let Err(errors) = validate_config(&config) {
        return Err(ConfigError::Validation(errors).into());
    }

    logging::init(&config.observability);

    tracing::info!(
        app = %config.application_name,
        bind_address = %config.listener.bind_address,
        worker_threads = config.listener.worker_threads,
        shutdown_enabled = config.shutdown.enabled,
        poll_interval_secs = config.shutdown.poll_interval_secs,
        timeout_secs = config.shutdown.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let signals = ProcessSignals::new();
    tokio::spawn(listen_for_signals(signals.clone()));

    let routes = demo::routes(&config.application_name);
    let app = Application::build(config, routes).await?;
    tracing::info!(address = %app.local_addr(), "Listening for connections");

    app.run(&signals).await?;
    Ok(())
}
