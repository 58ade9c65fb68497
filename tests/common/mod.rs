//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

use graceful_drain::net::ListenerHandle;
use graceful_drain::pool::{DrainablePool, PoolState};

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Capture everything logged on the current thread until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.contains(needle))
            .collect()
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.0))
    }
}

/// A pool whose tasks all finish at a scripted instant.
///
/// Records every call the shutdown path makes so tests can check ordering.
pub struct ScriptedPool {
    started: Instant,
    finishes_after: Option<Duration>,
    active: usize,
    queued: AtomicUsize,
    shut_down: AtomicBool,
    waits: Mutex<Vec<Duration>>,
    events: Mutex<Vec<String>>,
    listener: OnceLock<ListenerHandle>,
}

impl ScriptedPool {
    /// `active` tasks that finish after `finishes_after`, or never.
    pub fn new(active: usize, finishes_after: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            finishes_after,
            active,
            queued: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            waits: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            listener: OnceLock::new(),
        })
    }

    /// Let the pool report whether the listener was paused when it was shut down.
    pub fn watch_listener(&self, listener: ListenerHandle) {
        let _ = self.listener.set(listener);
    }

    /// Report `queued` tasks waiting for a worker that never frees up.
    pub fn set_queued(&self, queued: usize) {
        self.queued.store(queued, Ordering::SeqCst);
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn finished(&self) -> bool {
        self.finishes_after
            .is_some_and(|after| Instant::now() >= self.started + after)
    }
}

#[async_trait]
impl DrainablePool for ScriptedPool {
    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let paused = self.listener.get().map(|l| l.is_paused());
        self.events
            .lock()
            .unwrap()
            .push(format!("shutdown paused={:?}", paused));
    }

    fn active_count(&self) -> usize {
        if self.finished() {
            0
        } else {
            self.active
        }
    }

    fn queued_count(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    fn state(&self) -> PoolState {
        match (self.shut_down.load(Ordering::SeqCst), self.finished()) {
            (false, _) => PoolState::Running,
            (true, false) => PoolState::ShuttingDown,
            (true, true) => PoolState::Terminated,
        }
    }

    async fn await_quiescence(&self, timeout: Duration) -> bool {
        self.waits.lock().unwrap().push(timeout);
        self.events.lock().unwrap().push("poll".to_string());

        let deadline = self.finishes_after.map(|after| self.started + after);
        match deadline {
            Some(deadline) if deadline <= Instant::now() + timeout => {
                tokio::time::sleep_until(deadline).await;
                true
            }
            _ => {
                tokio::time::sleep(timeout).await;
                false
            }
        }
    }
}
