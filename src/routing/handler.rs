//! Request/response types and the handler abstraction.
//!
//! # Responsibilities
//! - Carry the parsed request (method, path, raw query, body) to a handler
//! - Give handlers a mutable response preset with the route's content type
//! - Define the error type that the dispatcher converts into a 500
//!
//! # Design Decisions
//! - Handlers are trait objects stored in the route table with their
//!   dependencies captured at registration time
//! - Handler futures borrow the request and response for their lifetime,
//!   so no per-request allocation beyond the boxed future

use axum::body::Bytes;
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;

use crate::config::{ConfigError, UpdateError};
use crate::convert::ConvertError;
use crate::ruleset::FetchError;

pub const NOT_FOUND_BODY: &str = "Not Found\n";
pub const BAD_REQUEST_BODY: &str = "Bad Request\n";
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error\n";
pub const NOT_IMPLEMENTED_BODY: &str = "Not Implemented\n";

/// A fully buffered incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub argument: String,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            argument: String::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = argument.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of query argument `key`, percent-decoded.
    pub fn arg(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.argument.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Like [`Request::arg`], but a literal `+` stays `+` instead of
    /// becoming a space. Used where a value is compared byte for byte.
    pub fn arg_verbatim(&self, key: &str) -> Option<String> {
        let escaped = self.argument.replace('+', "%2B");
        url::form_urlencoded::parse(escaped.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Response under construction by a handler.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl Response {
    /// An empty 200 response with the given content type.
    pub fn new(content_type: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            body: Bytes::new(),
        }
    }

    /// A `text/plain` response, used for dispatcher-level replies.
    pub fn plain(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Override both status and body.
    pub fn reply(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        self.status = status;
        self.body = body.into();
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

/// Failure inside a handler. Always surfaces as a 500.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// A route handler.
pub trait Handler: Send + Sync {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;
}

/// Adapter for handlers that never wait on I/O.
pub struct SyncHandler<F>(pub F);

impl<F> Handler for SyncHandler<F>
where
    F: Fn(&Request, &mut Response) -> Result<(), HandlerError> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(std::future::ready((self.0)(request, response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_decodes_percent_and_plus() {
        let req = Request::new(Method::GET, "/get")
            .with_argument("url=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&name=a+b");
        assert_eq!(req.arg("url").as_deref(), Some("https://example.com/a?b=1"));
        assert_eq!(req.arg("name").as_deref(), Some("a b"));
        assert_eq!(req.arg("missing"), None);
    }

    #[test]
    fn arg_takes_first_occurrence() {
        let req = Request::new(Method::GET, "/").with_argument("token=a&token=b");
        assert_eq!(req.arg("token").as_deref(), Some("a"));
    }

    #[test]
    fn new_response_defaults_to_ok() {
        let resp = Response::new("text/plain;charset=utf-8");
        assert_eq!(resp.status, StatusCode::OK);
        assert!(resp.body.is_empty());
    }
}
