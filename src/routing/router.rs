//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the fixed (method, path) → (content type, handler) table
//! - Reject duplicate registrations
//! - Resolve a request to exactly one handler or an explicit 404
//! - Contain handler failures (errors and panics) as 500s
//!
//! # Design Decisions
//! - Registration needs `&mut self`; the server only ever holds the table
//!   behind `Arc`, so it is immutable once serving starts
//! - O(1) exact lookup via HashMap, no prefix or pattern matching

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use futures_util::FutureExt;

use crate::observability::metrics;
use crate::routing::handler::{Handler, Request, Response, INTERNAL_ERROR_BODY, NOT_FOUND_BODY};

/// One registered route.
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
    pub content_type: &'static str,
    handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route {method} {path} registered twice")]
    Duplicate { method: Method, path: String },
}

/// The dispatcher's route table.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<(Method, String), RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. Fails if (method, path) is already taken.
    pub fn register<H>(
        &mut self,
        method: Method,
        path: impl Into<String>,
        content_type: &'static str,
        handler: H,
    ) -> Result<(), RouteError>
    where
        H: Handler + 'static,
    {
        let path = path.into();
        let key = (method.clone(), path.clone());
        if self.routes.contains_key(&key) {
            return Err(RouteError::Duplicate { method, path });
        }

        tracing::debug!(method = %method, path = %path, content_type, "Route registered");
        self.routes.insert(
            key,
            RouteEntry {
                method,
                path,
                content_type,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        self.routes.get(&(method.clone(), path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.values()
    }

    /// Resolve and run the handler for `request`.
    pub async fn dispatch(&self, request: Request) -> Response {
        let start = Instant::now();

        let Some(entry) = self.lookup(&request.method, &request.path) else {
            tracing::debug!(method = %request.method, path = %request.path, "No route matched");
            metrics::record_request(&request.method, "unmatched", StatusCode::NOT_FOUND, start);
            return Response::plain(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
        };

        let mut response = Response::new(entry.content_type);
        let outcome = AssertUnwindSafe(entry.handler.call(&request, &mut response))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(())) => response,
            Ok(Err(e)) => {
                tracing::error!(method = %request.method, path = %request.path, error = %e, "Handler failed");
                Response::plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
            }
            Err(_) => {
                tracing::error!(method = %request.method, path = %request.path, "Handler panicked");
                Response::plain(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY)
            }
        };

        metrics::record_request(&request.method, &entry.path, response.status, start);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::{HandlerError, SyncHandler};

    fn ok_handler(body: &'static str) -> SyncHandler<impl Fn(&Request, &mut Response) -> Result<(), HandlerError>> {
        SyncHandler(move |_: &Request, resp: &mut Response| {
            resp.set_body(body);
            Ok(())
        })
    }

    #[test]
    fn duplicate_route_rejected() {
        let mut table = RouteTable::new();
        table.register(Method::GET, "/", "text/plain", ok_handler("a")).unwrap();
        let err = table.register(Method::GET, "/", "text/plain", ok_handler("b"));
        assert!(matches!(err, Err(RouteError::Duplicate { .. })));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn same_path_different_method_allowed() {
        let mut table = RouteTable::new();
        table.register(Method::GET, "/x", "text/plain", ok_handler("a")).unwrap();
        table.register(Method::POST, "/x", "text/plain", ok_handler("b")).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn dispatch_uses_route_content_type() {
        let mut table = RouteTable::new();
        table
            .register(Method::GET, "/sub", "text/plain;charset=utf-8", ok_handler("hello"))
            .unwrap();

        let resp = table.dispatch(Request::new(Method::GET, "/sub")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.content_type, "text/plain;charset=utf-8");
        assert_eq!(&resp.body[..], b"hello");
    }

    #[tokio::test]
    async fn unmatched_method_or_path_is_404() {
        let mut table = RouteTable::new();
        table.register(Method::GET, "/sub", "text/plain", ok_handler("x")).unwrap();

        let resp = table.dispatch(Request::new(Method::POST, "/sub")).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);

        let resp = table.dispatch(Request::new(Method::GET, "/sub/")).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(&resp.body[..], NOT_FOUND_BODY.as_bytes());
    }

    #[tokio::test]
    async fn panicking_handler_becomes_500() {
        let mut table = RouteTable::new();
        table
            .register(
                Method::GET,
                "/boom",
                "text/plain",
                SyncHandler(|_: &Request, _: &mut Response| -> Result<(), HandlerError> {
                    panic!("converter bug")
                }),
            )
            .unwrap();

        let resp = table.dispatch(Request::new(Method::GET, "/boom")).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&resp.body[..], INTERNAL_ERROR_BODY.as_bytes());
    }
}
