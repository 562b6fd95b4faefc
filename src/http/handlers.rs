//! Concrete route handlers.
//!
//! Each handler owns the dependencies it needs, captured when the route
//! table is built. Administrative handlers read the access token from the
//! current state snapshot, so a reload that changes it applies to the next
//! request.

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::admin;
use crate::config::{ConfigController, UpdateError};
use crate::convert::{ConvertContext, Converter, Endpoint};
use crate::routing::handler::{BAD_REQUEST_BODY, NOT_IMPLEMENTED_BODY};
use crate::routing::{Handler, HandlerError, Request, Response};
use crate::ruleset::Fetcher;

pub const DONE_BODY: &str = "done\n";

/// `/refreshrules`: refresh every ruleset and regenerate templates.
pub struct RefreshRulesHandler {
    pub controller: Arc<ConfigController>,
}

impl Handler for RefreshRulesHandler {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            if !admin::authorize(&self.controller.state().access_token, request, response) {
                return Ok(());
            }
            let generation = self.controller.refresh_rulesets().await;
            tracing::info!(
                generation = generation.id(),
                failed = generation.failed_count(),
                "Rulesets refreshed on request"
            );
            response.set_body(DONE_BODY);
            Ok(())
        })
    }
}

/// `/readconf`: reload the preference file. Rulesets are left alone.
pub struct ReadConfHandler {
    pub controller: Arc<ConfigController>,
}

impl Handler for ReadConfHandler {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            if !admin::authorize(&self.controller.state().access_token, request, response) {
                return Ok(());
            }
            self.controller.reload().await?;
            response.set_body(DONE_BODY);
            Ok(())
        })
    }
}

/// `POST /updateconf?type=form|direct`.
pub struct UpdateConfHandler {
    pub controller: Arc<ConfigController>,
}

impl Handler for UpdateConfHandler {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            if !admin::authorize(&self.controller.state().access_token, request, response) {
                return Ok(());
            }
            let encoding = request.arg("type").unwrap_or_default();
            match self.controller.apply_update(&request.body, &encoding).await {
                Ok(()) => {
                    response.set_body(DONE_BODY);
                    Ok(())
                }
                Err(UpdateError::NotImplemented(kind)) => {
                    tracing::warn!(encoding = %kind, "Unsupported update encoding");
                    response.reply(StatusCode::NOT_IMPLEMENTED, NOT_IMPLEMENTED_BODY);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

/// One of the converter endpoints.
pub struct ConvertHandler {
    pub endpoint: Endpoint,
    pub converter: Arc<dyn Converter>,
    pub controller: Arc<ConfigController>,
}

impl Handler for ConvertHandler {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            if self.controller.state().update_ruleset_on_request {
                self.controller.refresh_rulesets().await;
            }
            let ctx = ConvertContext::snapshot(request, &self.controller);
            self.converter
                .convert(self.endpoint, ctx, response)
                .await?;
            Ok(())
        })
    }
}

/// `/get?url=`: fetch a remote document verbatim.
pub struct GetHandler {
    pub fetcher: Arc<dyn Fetcher>,
}

impl Handler for GetHandler {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            let Some(url) = request.arg("url").filter(|u| !u.is_empty()) else {
                response.reply(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
                return Ok(());
            };
            let body = self.fetcher.fetch_remote(&url).await?;
            response.set_body(body);
            Ok(())
        })
    }
}

/// `/getlocal?path=`: read a local file verbatim.
pub struct GetLocalHandler {
    pub fetcher: Arc<dyn Fetcher>,
}

impl Handler for GetLocalHandler {
    fn call<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            let Some(path) = request.arg("path").filter(|p| !p.is_empty()) else {
                response.reply(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
                return Ok(());
            };
            let body = self.fetcher.fetch_local(Path::new(&path)).await?;
            response.set_body(body);
            Ok(())
        })
    }
}
