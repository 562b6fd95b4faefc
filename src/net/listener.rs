//! TCP listener and worker pool.
//!
//! # Responsibilities
//! - Bind to the configured address with the configured accept backlog
//! - Accept connections, at most `max_workers` in flight
//! - Stop accepting on shutdown and drain in-flight connections
//! - Publish the listener state for observers

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{watch, Semaphore};

use crate::config::ServerConfig;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::connection::serve_connection;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A bound socket plus the worker permits that bound concurrent connections.
pub struct Listener {
    inner: TcpListener,
    workers: Arc<Semaphore>,
    max_workers: usize,
    state: watch::Sender<ListenerState>,
}

impl Listener {
    /// Bind and listen. The kernel refuses connections beyond `backlog`.
    pub fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        let addr = config.socket_addr();
        let bind_err = |source| ListenerError::Bind { addr, source };

        let (state, _) = watch::channel(ListenerState::Stopped);
        state.send_replace(ListenerState::Starting);

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        let inner = socket.listen(config.backlog).map_err(bind_err)?;

        let max_workers = config.max_workers.max(1);
        tracing::info!(
            address = %inner.local_addr().unwrap_or(addr),
            backlog = config.backlog,
            max_workers,
            "Listener bound"
        );

        Ok(Self {
            inner,
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            state,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Accept until `shutdown` fires, then wait for every worker to finish.
    pub async fn serve(self, app: Router, mut shutdown: ShutdownSignal) {
        let Listener {
            inner,
            workers,
            max_workers,
            state,
        } = self;
        state.send_replace(ListenerState::Running);

        loop {
            // Backpressure: no accept without a free worker.
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = Arc::clone(&workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = inner.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        drop(permit);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                },
            };

            tracing::debug!(
                peer_addr = %peer,
                available_workers = workers.available_permits(),
                "Connection accepted"
            );

            let app = app.clone();
            tokio::spawn(async move {
                serve_connection(stream, peer, app).await;
                drop(permit);
            });
        }

        state.send_replace(ListenerState::Stopping);
        drop(inner);
        tracing::info!(
            in_flight = max_workers - workers.available_permits(),
            "Listener closed, draining workers"
        );

        // Every permit back means every connection task has finished.
        let permits = u32::try_from(max_workers).unwrap_or(u32::MAX);
        if let Ok(all) = workers.acquire_many(permits).await {
            drop(all);
        }

        state.send_replace(ListenerState::Stopped);
        tracing::info!("Listener stopped");
    }
}
