//! Smoke-test routes served by the binary.
//!
//! `/hello` answers immediately; `/slow?secs=N` holds a worker for `N`
//! seconds, which is enough to watch a drain happen from the outside.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;

const MAX_SLOW_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct SlowParams {
    #[serde(default = "default_slow_secs")]
    secs: u64,
}

fn default_slow_secs() -> u64 {
    5
}

async fn hello(State(name): State<Arc<str>>) -> String {
    format!("Hello {}", name)
}

async fn slow(State(name): State<Arc<str>>, Query(params): Query<SlowParams>) -> String {
    let secs = params.secs.min(MAX_SLOW_SECS);
    tracing::info!(secs, "Slow request received");
    tokio::time::sleep(Duration::from_secs(secs)).await;
    tracing::info!(secs, "Slow request complete");
    format!("Slow {}", name)
}

pub fn routes(application_name: &str) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .route("/slow", get(slow))
        .with_state(Arc::<str>::from(application_name))
}
