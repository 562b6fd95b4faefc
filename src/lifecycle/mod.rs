//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Parse flags → Load preferences → Eager ruleset refresh
//!     → Generator mode: run artifacts, return their exit code
//!     → Server mode: env overrides → routes → bind → serve
//!
//! Shutdown (shutdown.rs):
//!     trigger() → Stop accepting → Drain workers → Exit 0
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP/SIGQUIT → Shutdown::trigger
//!     SIGPIPE/SIGABRT → ignored
//! ```
//!
//! # Design Decisions
//! - The mode is decided once from the flags, before any server state exists
//! - Listeners start last (traffic only when routes are ready)
//! - Signals are installed by the binary, so `run` can be driven from tests

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{run, Collaborators, LaunchOptions, Mode};
