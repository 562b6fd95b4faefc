//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (net::connection, hyper HTTP/1.1)
//!     → server.rs (axum fallback: buffer body, build routing::Request)
//!     → routing::RouteTable::dispatch
//!     → handlers.rs (Guard, controller, converter, fetcher)
//!     → routing::Response → axum response → close
//!
//! Startup:
//!     routes.rs builds the fixed route table once
//! ```
//!
//! # Design Decisions
//! - axum only adapts; every route lives in the dispatcher's table so the
//!   table can be inspected and tested without a socket
//! - Bodies are fully buffered up to `advanced.max_body_size`; larger or
//!   unreadable bodies are a 400 before any handler runs

pub mod handlers;
pub mod routes;
pub mod server;

pub use routes::{register_routes, BANNER};
pub use server::HttpServer;
