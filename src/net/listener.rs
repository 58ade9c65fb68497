//! TCP listener with backpressure and pause/resume control.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Stop delivering new connections while paused, leaving open ones alone
//!
//! # Design Decisions
//! - While paused the accept loop does not call `accept`, so new attempts
//!   wait in the OS backlog instead of reaching the application
//! - Delivery happens while holding the gate's read lock; `pause` takes the
//!   write lock, so nothing is delivered once `pause` has returned

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

use crate::config::ListenerConfig;
use crate::observability::metrics;
use crate::pool::DrainablePool;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),
}

/// Receives the listener once the network layer has bound it.
pub trait ListenerBinder: Send + Sync {
    /// Record the listener. A later call replaces the earlier one.
    fn on_bind(&self, listener: ListenerHandle);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Gate {
    paused: bool,
    closed: bool,
}

struct ListenerControl {
    local_addr: SocketAddr,
    gate: watch::Sender<Gate>,
    pool: Option<Arc<dyn DrainablePool>>,
}

/// Cloneable control surface of a bound listener.
#[derive(Clone)]
pub struct ListenerHandle {
    inner: Arc<ListenerControl>,
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gate = *self.inner.gate.borrow();
        f.debug_struct("ListenerHandle")
            .field("local_addr", &self.inner.local_addr)
            .field("paused", &gate.paused)
            .field("closed", &gate.closed)
            .field("has_pool", &self.inner.pool.is_some())
            .finish()
    }
}

impl std::fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener[{}]", self.inner.local_addr)
    }
}

impl ListenerHandle {
    /// Create a control handle for a listener on `local_addr`, backed by `pool`.
    pub fn new(local_addr: SocketAddr, pool: Option<Arc<dyn DrainablePool>>) -> Self {
        let (gate, _) = watch::channel(Gate::default());
        Self {
            inner: Arc::new(ListenerControl {
                local_addr,
                gate,
                pool,
            }),
        }
    }

    /// Stop delivering new connections. Idempotent; a no-op once closed.
    pub fn pause(&self) {
        if self.set_paused(true) {
            metrics::set_listener_paused(true);
            tracing::info!(listener = %self, "Paused listener to stop accepting new requests");
        }
    }

    /// Resume delivering connections after [`pause`](Self::pause).
    pub fn resume(&self) {
        if self.set_paused(false) {
            metrics::set_listener_paused(false);
            tracing::info!(listener = %self, "Resumed listener");
        }
    }

    fn set_paused(&self, paused: bool) -> bool {
        let mut closed = false;
        let changed = self.inner.gate.send_if_modified(|gate| {
            if gate.closed {
                closed = true;
                return false;
            }
            let changed = gate.paused != paused;
            gate.paused = paused;
            changed
        });
        if closed {
            tracing::debug!(listener = %self, paused, "Listener already closed, ignoring");
        }
        changed
    }

    /// Stop the accept loop for good.
    pub fn close(&self) {
        let changed = self.inner.gate.send_if_modified(|gate| {
            let changed = !gate.closed;
            gate.closed = true;
            changed
        });
        if changed {
            tracing::info!(listener = %self, "Listener closed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.gate.borrow().paused
    }

    pub fn is_closed(&self) -> bool {
        self.inner.gate.borrow().closed
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// The pool running this listener's requests, if it has a managed one.
    pub fn worker_pool(&self) -> Option<Arc<dyn DrainablePool>> {
        self.inner.pool.clone()
    }

    fn subscribe(&self) -> watch::Receiver<Gate> {
        self.inner.gate.subscribe()
    }

    /// Run `deliver` unless the listener is paused or closed.
    fn admit<F: FnOnce()>(&self, deliver: F) -> bool {
        let gate = self.inner.gate.borrow();
        if gate.paused || gate.closed {
            return false;
        }
        deliver();
        true
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
    handle: ListenerHandle,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(
        config: &ListenerConfig,
        pool: Option<Arc<dyn DrainablePool>>,
    ) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            managed_pool = pool.is_some(),
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
            handle: ListenerHandle::new(local_addr, pool),
        })
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Accept connections until the listener is closed, handing each one to
    /// `deliver`.
    ///
    /// A connection the OS handed over while the listener was being paused is
    /// dropped rather than delivered.
    pub async fn run<F>(self, mut deliver: F)
    where
        F: FnMut(TcpStream, SocketAddr, ConnectionPermit),
    {
        let mut gate = self.handle.subscribe();

        loop {
            // Parked while paused: nothing calls accept, the OS queues.
            let current = match gate.wait_for(|g| g.closed || !g.paused).await {
                Ok(g) => *g,
                Err(_) => break,
            };
            if current.closed {
                break;
            }

            // Gate first: a pause observed together with a pending
            // connection leaves that connection in the backlog.
            let permit = tokio::select! {
                biased;
                _ = gate.wait_for(|g| g.closed || g.paused) => continue,
                permit = Arc::clone(&self.connection_limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let accepted = tokio::select! {
                biased;
                _ = gate.wait_for(|g| g.closed || g.paused) => continue,
                accepted = self.inner.accept() => accepted.map_err(ListenerError::Accept),
            };

            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let permit = ConnectionPermit { _permit: permit };
            let mut pending = Some((stream, permit));
            let delivered = self.handle.admit(|| {
                if let Some((stream, permit)) = pending.take() {
                    deliver(stream, peer, permit);
                }
            });

            if delivered {
                metrics::record_connection_accepted();
                tracing::debug!(
                    peer_addr = %peer,
                    available_permits = self.connection_limit.available_permits(),
                    "Connection accepted"
                );
            } else {
                tracing::debug!(peer_addr = %peer, "Listener paused, refusing connection");
            }
        }

        tracing::info!(address = %self.handle.local_addr(), "Accept loop stopped");
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
