//! Shutdown coordination.
//!
//! # Design Decisions
//! - `trigger` is idempotent: only the first caller logs and flips the flag,
//!   so two signals in quick succession produce one stop sequence
//! - A `watch` channel instead of `broadcast` so late subscribers still see
//!   that shutdown already happened

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

struct Inner {
    tx: watch::Sender<bool>,
    fired: AtomicBool,
}

/// Coordinator for graceful shutdown. Cheap to clone.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                tx,
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Start the stop sequence. Returns `false` if it was already started.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.inner.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!(reason, "Shutdown already in progress");
            return false;
        }
        tracing::error!(fatal = true, reason, "Shutting down");
        self.inner.tx.send_replace(true);
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.inner.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed to long-running tasks.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown has been triggered, immediately if it already was.
    pub async fn cancelled(&mut self) {
        // The sender lives in `Shutdown`; if every handle is gone nobody can
        // trigger any more, so treat that as cancelled as well.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}
