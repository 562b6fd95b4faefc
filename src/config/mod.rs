//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! preference file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → state.rs (RuntimeState + ServerConfig, env overrides applied)
//!     → controller.rs (atomic swap of Arc<RuntimeState>)
//!     → handlers observe the new state on their next request
//!
//! On /updateconf:
//!     form.rs (form body → TOML) or body verbatim
//!     → write preference file
//!     → controller.rs load → optional ruleset refresh
//! ```
//!
//! # Design Decisions
//! - RuntimeState is immutable once published; changes require full reload
//! - All fields have defaults to allow minimal preference files
//! - ServerConfig is fixed when the listener starts; reloads do not rebind
//! - Environment overrides are captured once at startup (env.rs)

pub mod controller;
pub mod env;
pub mod form;
pub mod loader;
pub mod schema;
pub mod state;
pub mod validation;

pub use controller::{ConfigController, UpdateEncoding, UpdateError};
pub use env::{EnvOverrides, Tribool};
pub use loader::ConfigError;
pub use schema::{ArtifactConfig, Preferences, RulesetEntry};
pub use state::{LaunchFlags, RuntimeState, ServerConfig};
