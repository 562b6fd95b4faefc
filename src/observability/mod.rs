//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stdout or the -l file)
//!     → metrics.rs (request and ruleset refresh counters/histograms)
//!
//! Consumers:
//!     → Operator (terminal or log file)
//!     → Metrics endpoint (Prometheus scrape, only when configured)
//! ```
//!
//! # Design Decisions
//! - Fatal conditions are `error` events carrying `fatal = true`
//! - Metric updates without an installed recorder are no-ops, so tests and
//!   the generator never need an exporter

pub mod logging;
pub mod metrics;
