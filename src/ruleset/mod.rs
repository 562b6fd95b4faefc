//! Ruleset subsystem.
//!
//! # Data Flow
//! ```text
//! [[rulesets]] entries in the preference file
//!     → source.rs (locator → RulesetSource {tag, origin, kind})
//!     → store.rs refresh (one fetch per source via fetch.rs)
//!     → Generation N+1 (same length, same order as the sources)
//!     → atomic swap; readers holding N keep a consistent view
//!
//! Refresh triggers:
//!     eager: startup and /updateconf (update_ruleset_on_request = false)
//!     lazy:  converter handlers before each conversion (flag = true)
//!     explicit: /refreshrules
//! ```

pub mod fetch;
pub mod source;
pub mod store;

pub use fetch::{fetch_origin, FetchError, Fetcher, HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use source::{Origin, RulesetKind, RulesetSource, SourceError};
pub use store::{Generation, RulesetContent, RulesetStore};
