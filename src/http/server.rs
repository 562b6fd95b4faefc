//! axum adapter in front of the route dispatcher.
//!
//! # Responsibilities
//! - Create the axum Router with a single fallback handler
//! - Wire up the tracing middleware
//! - Turn an `http::Request` into a dispatcher request
//! - Run the listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::Listener;
use crate::routing::handler::BAD_REQUEST_BODY;
use crate::routing::{self, RouteTable};

/// Application state injected into the fallback handler.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub max_body_size: usize,
}

pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(routes: Arc<RouteTable>, max_body_size: usize) -> Self {
        let state = AppState {
            routes,
            max_body_size,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires and all workers drain.
    pub async fn run(self, listener: Listener, shutdown: ShutdownSignal) {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(address = %addr, "HTTP server starting"),
            Err(e) => tracing::warn!(error = %e, "HTTP server starting on unknown address"),
        }
        listener.serve(self.router, shutdown).await;
        tracing::info!("HTTP server stopped");
    }
}

async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                ?peer,
                path = %parts.uri.path(),
                error = %e,
                "Rejecting unreadable request body"
            );
            return routing::Response::plain(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY)
                .into_response();
        }
    };

    let request = routing::Request::new(parts.method, parts.uri.path())
        .with_argument(parts.uri.query().unwrap_or_default())
        .with_body(body);

    tracing::debug!(?peer, method = %request.method, path = %request.path, "Dispatching request");
    state.routes.dispatch(request).await.into_response()
}
