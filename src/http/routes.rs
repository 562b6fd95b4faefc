//! The fixed route table.

use std::sync::Arc;

use axum::http::Method;

use crate::config::ConfigController;
use crate::convert::{Converter, Endpoint, CONVERTER_CONTENT_TYPE};
use crate::http::handlers::{
    ConvertHandler, GetHandler, GetLocalHandler, ReadConfHandler, RefreshRulesHandler,
    UpdateConfHandler,
};
use crate::routing::{HandlerError, Request, Response, RouteError, RouteTable, SyncHandler};
use crate::ruleset::Fetcher;

pub const BANNER: &str = concat!("subconverter ", env!("CARGO_PKG_VERSION"), " backend\n");

const TEXT_PLAIN: &str = "text/plain";

fn banner(_: &Request, response: &mut Response) -> Result<(), HandlerError> {
    response.set_body(BANNER);
    Ok(())
}

/// Build every route. `/get` and `/getlocal` are left out in API mode.
pub fn register_routes(
    controller: &Arc<ConfigController>,
    converter: Arc<dyn Converter>,
    fetcher: Arc<dyn Fetcher>,
) -> Result<RouteTable, RouteError> {
    let mut routes = RouteTable::new();

    routes.register(Method::GET, "/", TEXT_PLAIN, SyncHandler(banner))?;
    routes.register(Method::GET, "/version", TEXT_PLAIN, SyncHandler(banner))?;

    routes.register(
        Method::GET,
        "/refreshrules",
        TEXT_PLAIN,
        RefreshRulesHandler {
            controller: Arc::clone(controller),
        },
    )?;
    routes.register(
        Method::GET,
        "/readconf",
        TEXT_PLAIN,
        ReadConfHandler {
            controller: Arc::clone(controller),
        },
    )?;
    routes.register(
        Method::POST,
        "/updateconf",
        TEXT_PLAIN,
        UpdateConfHandler {
            controller: Arc::clone(controller),
        },
    )?;

    for endpoint in Endpoint::ALL {
        routes.register(
            Method::GET,
            endpoint.path(),
            CONVERTER_CONTENT_TYPE,
            ConvertHandler {
                endpoint,
                converter: Arc::clone(&converter),
                controller: Arc::clone(controller),
            },
        )?;
    }

    let api_mode = controller.state().api_mode;
    if !api_mode {
        routes.register(
            Method::GET,
            "/get",
            CONVERTER_CONTENT_TYPE,
            GetHandler {
                fetcher: Arc::clone(&fetcher),
            },
        )?;
        routes.register(
            Method::GET,
            "/getlocal",
            CONVERTER_CONTENT_TYPE,
            GetLocalHandler { fetcher },
        )?;
    }

    tracing::info!(routes = routes.len(), api_mode, "Routes registered");
    Ok(routes)
}
