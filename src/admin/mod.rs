//! Administrative endpoint protection.
//!
//! `/refreshrules`, `/readconf` and `/updateconf` pass through
//! [`auth::authorize`] before touching any state.

pub mod auth;

pub use auth::{authorize, check, Access, FORBIDDEN_BODY};
