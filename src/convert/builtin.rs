//! Converter used when no format converters are plugged in.
//!
//! Serves `/getruleset?name=<group>` straight from the ruleset cache and
//! answers every other endpoint with 501.

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::convert::{ConvertContext, ConvertError, Converter, Endpoint};
use crate::routing::handler::{BAD_REQUEST_BODY, NOT_FOUND_BODY, NOT_IMPLEMENTED_BODY};
use crate::routing::Response;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl Converter for BuiltinConverter {
    fn convert<'a>(
        &'a self,
        endpoint: Endpoint,
        ctx: ConvertContext<'a>,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), ConvertError>> {
        Box::pin(async move {
            match endpoint {
                Endpoint::GetRuleset => serve_ruleset(&ctx, response),
                other => {
                    tracing::warn!(endpoint = %other, "No converter available for endpoint");
                    response.reply(StatusCode::NOT_IMPLEMENTED, NOT_IMPLEMENTED_BODY);
                }
            }
            Ok(())
        })
    }
}

/// Concatenated rules of every cached entry tagged `name`.
fn serve_ruleset(ctx: &ConvertContext<'_>, response: &mut Response) {
    let Some(name) = ctx.request.arg("name").filter(|n| !n.is_empty()) else {
        response.reply(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
        return;
    };

    let mut matched = ctx.rulesets.by_tag(&name).peekable();
    if matched.peek().is_none() {
        response.reply(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
        return;
    }

    let mut body = String::new();
    for content in matched {
        for rule in content.rules() {
            body.push_str(rule);
            body.push('\n');
        }
    }
    response.set_body(body);
}
