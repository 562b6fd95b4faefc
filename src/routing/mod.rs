//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, query, body)
//!     → router.rs (exact (method, path) lookup)
//!     → handler.rs (typed handler with captured dependencies)
//!     → Response (status, content type, body) or NotFound
//!
//! Route Registration (at startup):
//!     http::routes builds every handler
//!     → RouteTable::register (duplicates abort startup)
//!     → Freeze behind Arc for the listener
//! ```
//!
//! # Design Decisions
//! - Routes registered before the listener starts, immutable afterwards
//! - Exact match only; there are no patterns to order
//! - Handler failures never escape the dispatch boundary

pub mod handler;
pub mod router;

pub use handler::{Handler, HandlerError, Request, Response, SyncHandler};
pub use router::{RouteEntry, RouteError, RouteTable};
