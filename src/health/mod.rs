//! Liveness reporting.
//!
//! `GET /health` answers `200 OK` with `Up <application name>` for as long as
//! the listener keeps delivering connections. Once shutdown pauses the
//! listener, load balancers probing this endpoint stop seeing the instance.

use std::sync::Arc;

use axum::{extract::State, routing::get, Router};

pub const HEALTH_PATH: &str = "/health";

/// Body of the liveness report for `application_name`.
pub fn liveness_report(application_name: &str) -> String {
    format!("Up {}", application_name)
}

async fn health(State(application_name): State<Arc<str>>) -> String {
    liveness_report(&application_name)
}

/// Router serving the liveness endpoint.
pub fn router(application_name: &str) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .with_state(Arc::<str>::from(application_name))
}
