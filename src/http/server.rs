//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the liveness endpoint and application routes
//! - Wire up middleware (tracing, timeout, worker pool dispatch)
//! - Bind the listener and serve accepted connections

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tokio::sync::oneshot;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::health;
use crate::net::connection::serve_connection;
use crate::net::{ConnectionId, Listener, ListenerError};
use crate::pool::{DrainablePool, WorkerPool};

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    pool: Option<Arc<WorkerPool>>,
}

impl HttpServer {
    /// Create a new HTTP server serving `routes` plus the liveness endpoint.
    pub fn new(config: ServiceConfig, routes: Router) -> Self {
        let pool = (config.listener.worker_threads > 0).then(|| {
            Arc::new(WorkerPool::new(
                format!("{}-workers", config.application_name),
                config.listener.worker_threads,
            ))
        });

        let router = Self::build_router(&config, routes, pool.clone());
        Self {
            router,
            config,
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout sits inside the pool dispatch, so a timed out handler is
    /// dropped on its worker and stops counting as active.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, routes: Router, pool: Option<Arc<WorkerPool>>) -> Router {
        let mut router = routes
            .merge(health::router(&config.application_name))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));
        if let Some(pool) = pool {
            router = router.layer(middleware::from_fn_with_state(pool, dispatch_to_pool));
        }
        router.layer(TraceLayer::new_for_http())
    }

    /// The worker pool requests run on, if one is managed.
    pub fn pool(&self) -> Option<Arc<WorkerPool>> {
        self.pool.clone()
    }

    /// Bind the configured listener, attaching this server's pool to it.
    pub async fn bind(&self) -> Result<Listener, ListenerError> {
        let pool = self
            .pool
            .clone()
            .map(|pool| pool as Arc<dyn DrainablePool>);
        Listener::bind(&self.config.listener, pool).await
    }

    /// Serve connections from `listener` until it is closed.
    ///
    /// Connections already open keep being served by their own tasks.
    pub async fn serve(self, listener: Listener) {
        tracing::info!(
            address = %listener.local_addr(),
            app = %self.config.application_name,
            "HTTP server starting"
        );

        let app = self.router;
        listener
            .run(move |stream, peer, permit| {
                let app = app.clone();
                let id = ConnectionId::new();
                tracing::trace!(connection_id = %id, peer_addr = %peer, "Serving connection");
                tokio::spawn(async move {
                    let _permit = permit;
                    serve_connection(stream, app, id).await;
                });
            })
            .await;

        tracing::info!("HTTP server stopped");
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Run the rest of the stack as a worker pool task.
///
/// Once the pool is shut down requests are answered with 503.
async fn dispatch_to_pool(
    State(pool): State<Arc<WorkerPool>>,
    request: Request,
    next: Next,
) -> Response {
    let (tx, rx) = oneshot::channel();
    let task = async move {
        let response = next.run(request).await;
        let _ = tx.send(response);
    };

    if let Err(e) = pool.submit(task) {
        tracing::debug!(error = %e, "Request rejected");
        return (StatusCode::SERVICE_UNAVAILABLE, "Service is shutting down").into_response();
    }

    match rx.await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!("Request handler dropped without responding");
            (StatusCode::INTERNAL_SERVER_ERROR, "Request handler failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn server(worker_threads: usize) -> HttpServer {
        let mut config = ServiceConfig::default();
        config.application_name = "app1".into();
        config.listener.worker_threads = worker_threads;
        HttpServer::new(config, Router::new().route("/hello", get(|| async { "Hello" })))
    }

    async fn status(router: &Router, path: &str) -> StatusCode {
        router
            .clone()
            .oneshot(axum::http::Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn serves_routes_and_health_through_pool() {
        let server = server(4);
        assert_eq!(status(&server.router, "/hello").await, StatusCode::OK);
        assert_eq!(status(&server.router, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_requests_once_pool_is_shut_down() {
        let server = server(4);
        server.pool().unwrap().shutdown();
        assert_eq!(
            status(&server.router, "/hello").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_request_releases_its_worker() {
        let mut config = ServiceConfig::default();
        config.application_name = "app1".into();
        config.listener.worker_threads = 1;
        config.timeouts.request_secs = 1;
        let routes = Router::new().route(
            "/stuck",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(100)).await;
                "done"
            }),
        );
        let server = HttpServer::new(config, routes);
        let pool = server.pool().unwrap();

        assert_eq!(
            status(&server.router, "/stuck").await,
            StatusCode::REQUEST_TIMEOUT
        );
        assert!(pool.await_quiescence(Duration::from_secs(1)).await);
        assert_eq!(pool.active_count(), 0);

        pool.shutdown();
        assert!(pool.is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_request_does_not_block_the_next_one() {
        let mut config = ServiceConfig::default();
        config.application_name = "app1".into();
        config.listener.worker_threads = 1;
        config.timeouts.request_secs = 1;
        let routes = Router::new()
            .route(
                "/stuck",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(100)).await;
                    "done"
                }),
            )
            .route("/hello", get(|| async { "Hello" }));
        let server = HttpServer::new(config, routes);

        assert_eq!(
            status(&server.router, "/stuck").await,
            StatusCode::REQUEST_TIMEOUT
        );
        let start = tokio::time::Instant::now();
        assert_eq!(status(&server.router, "/hello").await, StatusCode::OK);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn zero_workers_runs_without_pool() {
        let server = server(0);
        assert!(server.pool().is_none());
        assert_eq!(status(&server.router, "/hello").await, StatusCode::OK);
    }
}
