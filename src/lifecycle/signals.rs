//! OS signal handling (the platform bootstrap).
//!
//! # Responsibilities
//! - Register the termination-class signals for this platform
//! - Swallow signals that must not terminate the process
//! - Forward termination to [`Shutdown::trigger`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling; the OS-level handler only wakes a stream
//! - The watcher task never runs stop logic itself, it only forwards
//! - Unix handles SIGINT, SIGTERM, SIGHUP, SIGQUIT and ignores SIGPIPE and
//!   SIGABRT; other platforms only see Ctrl-C

use std::io;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// What a delivered signal means for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Terminate(&'static str),
    Ignored(&'static str),
}

#[cfg(unix)]
mod platform {
    use std::io;

    use tokio::signal::unix::{signal, Signal, SignalKind};

    use super::Received;

    /// SIGABRT; Tokio has no named constructor for it.
    const SIGABRT: i32 = 6;

    pub struct Signals {
        interrupt: Signal,
        terminate: Signal,
        hangup: Signal,
        quit: Signal,
        pipe: Signal,
        abort: Signal,
    }

    impl Signals {
        pub fn install() -> io::Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
                hangup: signal(SignalKind::hangup())?,
                quit: signal(SignalKind::quit())?,
                pipe: signal(SignalKind::pipe())?,
                abort: signal(SignalKind::from_raw(SIGABRT))?,
            })
        }

        pub async fn recv(&mut self) -> Received {
            tokio::select! {
                _ = self.interrupt.recv() => Received::Terminate("SIGINT"),
                _ = self.terminate.recv() => Received::Terminate("SIGTERM"),
                _ = self.hangup.recv() => Received::Terminate("SIGHUP"),
                _ = self.quit.recv() => Received::Terminate("SIGQUIT"),
                _ = self.pipe.recv() => Received::Ignored("SIGPIPE"),
                _ = self.abort.recv() => Received::Ignored("SIGABRT"),
            }
        }
    }
}

#[cfg(not(unix))]
mod platform {
    use std::io;

    use super::Received;

    pub struct Signals;

    impl Signals {
        pub fn install() -> io::Result<Self> {
            Ok(Self)
        }

        pub async fn recv(&mut self) -> Received {
            match tokio::signal::ctrl_c().await {
                Ok(()) => Received::Terminate("Ctrl-C"),
                Err(e) => {
                    tracing::warn!(error = %e, "Ctrl-C handler failed");
                    std::future::pending().await
                }
            }
        }
    }
}

pub use platform::Signals;

/// Register the platform's signal set. Must run inside a Tokio runtime.
pub fn install() -> io::Result<Signals> {
    Signals::install()
}

/// Forward signals to `shutdown` for the rest of the process lifetime.
pub fn watch_signals(mut signals: Signals, shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Received::Terminate(name) => {
                    shutdown.trigger(name);
                }
                Received::Ignored(name) => {
                    tracing::debug!(signal = name, "Ignoring signal");
                }
            }
        }
    })
}
