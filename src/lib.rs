//! Subscription converter backend core.
//!
//! Serves the HTTP control surface of a proxy-subscription converter: a fixed
//! route table with token-guarded administration, a generational ruleset
//! cache, hot-reloadable preferences and a bounded worker pool, plus a
//! one-shot generator mode. Format conversion itself plugs in through
//! [`convert::Converter`].

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod ruleset;

// Conversion seam
pub mod convert;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::{ConfigController, Preferences};
pub use convert::{Converter, Endpoint};
pub use http::HttpServer;
pub use lifecycle::{run, Collaborators, LaunchOptions, Mode, Shutdown};
