//! Ordered shutdown hooks.
//!
//! Hooks run one after another when the application context closes, lowest
//! order value first. Hooks registered with the same order run in
//! registration order.

use std::sync::Arc;

use async_trait::async_trait;

use crate::lifecycle::signals::LifecycleSignal;
use crate::lifecycle::ShutdownError;

/// Runs before every other hook.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
/// Runs after every other hook.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Work to perform while the application context closes.
#[async_trait]
pub trait ShutdownHook: Send + Sync {
    fn name(&self) -> &str;

    /// Perform the hook. Blocking waits must give up once `interrupt` fires.
    async fn on_shutdown(&self, interrupt: &LifecycleSignal) -> Result<(), ShutdownError>;
}

struct Registered {
    order: i32,
    hook: Arc<dyn ShutdownHook>,
}

/// Priority registry of shutdown hooks.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Vec<Registered>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, order: i32, hook: Arc<dyn ShutdownHook>) {
        tracing::debug!(hook = hook.name(), order, "Shutdown hook registered");
        // Stable insert keeps registration order among equal orders.
        let at = self.hooks.partition_point(|r| r.order <= order);
        self.hooks.insert(at, Registered { order, hook });
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in order. An interrupted hook stops the sequence and the
    /// interruption is returned unchanged.
    pub async fn run(&self, interrupt: &LifecycleSignal) -> Result<(), ShutdownError> {
        for registered in &self.hooks {
            tracing::debug!(hook = registered.hook.name(), "Running shutdown hook");
            registered.hook.on_shutdown(interrupt).await?;
        }
        Ok(())
    }
}
