//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the HTTP server and its worker pool
//! - Bind the listener and hand it to the shutdown coordinator
//! - Serve until the closing event, then run shutdown hooks
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The coordinator is only registered when graceful shutdown is enabled;
//!   otherwise closing stops the listener straight away

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::http::HttpServer;
use crate::lifecycle::hooks::{ShutdownHook, ShutdownHooks, HIGHEST_PRECEDENCE};
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::signals::ProcessSignals;
use crate::net::{Listener, ListenerBinder, ListenerHandle};

/// A bound, not yet serving, application.
pub struct Application {
    server: HttpServer,
    listener: Listener,
    hooks: ShutdownHooks,
    coordinator: Option<Arc<ShutdownCoordinator>>,
}

impl Application {
    /// Build the server for `config`, serving `routes` next to the liveness
    /// endpoint, and bind its listener.
    pub async fn build(config: ServiceConfig, routes: Router) -> Result<Self, AppError> {
        let server = HttpServer::new(config.clone(), routes);
        let listener = server.bind().await?;

        let mut hooks = ShutdownHooks::new();
        let coordinator = if config.shutdown.enabled {
            let coordinator = Arc::new(ShutdownCoordinator::new(
                config.application_name.clone(),
                config.shutdown.clone(),
            ));
            coordinator.on_bind(listener.handle());
            hooks.register(
                HIGHEST_PRECEDENCE,
                Arc::clone(&coordinator) as Arc<dyn ShutdownHook>,
            );
            Some(coordinator)
        } else {
            tracing::info!("Graceful shutdown disabled, closing will not drain");
            None
        };

        Ok(Self {
            server,
            listener,
            hooks,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn listener(&self) -> ListenerHandle {
        self.listener.handle()
    }

    pub fn coordinator(&self) -> Option<Arc<ShutdownCoordinator>> {
        self.coordinator.clone()
    }

    /// Register an additional hook to run when the application closes.
    pub fn register_hook(&mut self, order: i32, hook: Arc<dyn ShutdownHook>) {
        self.hooks.register(order, hook);
    }

    /// Serve until `signals.closing` fires, then run the shutdown hooks and
    /// stop the listener.
    ///
    /// Returns the interruption if `signals.interrupt` cut a hook short.
    pub async fn run(self, signals: &ProcessSignals) -> Result<(), AppError> {
        let handle = self.listener.handle();
        let serving = tokio::spawn(self.server.serve(self.listener));

        signals.closing.subscribe().recv().await;
        tracing::info!(hooks = self.hooks.len(), "Application closing, running shutdown hooks");

        let result = self.hooks.run(&signals.interrupt).await;
        handle.close();

        if let Err(e) = serving.await {
            tracing::error!(error = %e, "Server task failed");
        }

        match &result {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(e) => tracing::warn!(error = %e, "Shutdown cut short"),
        }
        result.map_err(AppError::from)
    }
}
