//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graceful_pool_active_tasks` (gauge): tasks currently holding a worker
//! - `graceful_pool_rejected_total` (counter): submissions refused after shutdown
//! - `graceful_listener_paused` (gauge): 1 while the listener is paused
//! - `graceful_connections_accepted_total` (counter): connections handed to the app
//! - `graceful_drain_total` (counter): shutdown sequences, labelled by outcome
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    if let Err(e) = builder.install() {
        tracing::error!(error = %e, "Failed to install Prometheus recorder");
    } else {
        tracing::info!(address = %addr, "Metrics server started");
    }
}

pub fn set_pool_active(active: usize) {
    gauge!("graceful_pool_active_tasks").set(active as f64);
}

pub fn record_rejected() {
    counter!("graceful_pool_rejected_total").increment(1);
}

pub fn set_listener_paused(paused: bool) {
    gauge!("graceful_listener_paused").set(if paused { 1.0 } else { 0.0 });
}

pub fn record_connection_accepted() {
    counter!("graceful_connections_accepted_total").increment(1);
}

pub fn record_drain(outcome: &'static str) {
    counter!("graceful_drain_total", "outcome" => outcome).increment(1);
}
