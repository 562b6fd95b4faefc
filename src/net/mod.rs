//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (kernel backlog = max_pending_connections)
//!     → listener.rs (worker permit, accept loop, stop on shutdown)
//!     → connection.rs (one HTTP/1.1 exchange, then close)
//!     → Hand off to the axum adapter (http::server)
//!
//! Listener States:
//!     Stopped → Starting → Running → Stopping → Stopped
//! ```
//!
//! # Design Decisions
//! - A permit is taken before `accept`, so at most `max_concurrent_threads`
//!   connections are served and the rest wait in the kernel backlog
//! - Keep-alive is off: every connection carries exactly one request
//! - Stopping closes the socket first, then waits for every permit

pub mod connection;
pub mod listener;

pub use connection::ConnectionId;
pub use listener::{Listener, ListenerError, ListenerState};
