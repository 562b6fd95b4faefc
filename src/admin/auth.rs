//! Access token check for administrative routes.
//!
//! # Design Decisions
//! - An empty configured token disables the check entirely
//! - The token travels as the `token` query argument and must match exactly;
//!   percent-escapes are decoded but `+` is not read as a space
//! - A rejected request is answered here; the handler body never runs

use axum::http::StatusCode;

use crate::routing::{Request, Response};

pub const FORBIDDEN_BODY: &str = "Forbidden\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

pub fn check(configured: &str, supplied: Option<&str>) -> Access {
    if configured.is_empty() || supplied == Some(configured) {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// Returns `false` after writing a 403 into `response`.
pub fn authorize(configured: &str, request: &Request, response: &mut Response) -> bool {
    let supplied = request.arg_verbatim("token");
    match check(configured, supplied.as_deref()) {
        Access::Allow => true,
        Access::Deny => {
            tracing::warn!(
                path = %request.path,
                token_supplied = supplied.is_some(),
                "Rejected administrative request"
            );
            *response = Response::plain(StatusCode::FORBIDDEN, FORBIDDEN_BODY);
            false
        }
    }
}
