//! Converter collaborators.
//!
//! # Data Flow
//! ```text
//! /sub, /getruleset, ... (http::handlers::ConvertHandler)
//!     → optional lazy ruleset refresh
//!     → ConvertContext (request + state/ruleset/template snapshots)
//!     → Converter::convert(endpoint, ctx, response)
//!
//! Generator mode (generator.rs):
//!     [[artifacts]] → synthetic /sub request → Converter → output file
//!
//! Artifact regeneration (templates.rs):
//!     [templates] → fetch each base → atomic swap of the template map
//! ```
//!
//! # Design Decisions
//! - Format translation lives behind the `Converter` trait; the server core
//!   only decides when rulesets are refreshed and which snapshot is passed
//! - Contexts carry `Arc` snapshots so a conversion sees one consistent
//!   generation even if a refresh lands mid-request

pub mod builtin;
pub mod generator;
pub mod templates;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::config::{ConfigController, RuntimeState};
use crate::routing::{Request, Response};
use crate::ruleset::{FetchError, Generation};

pub use builtin::BuiltinConverter;
pub use generator::Generator;
pub use templates::TemplateSet;

/// Content type of every converter route.
pub const CONVERTER_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// The converter routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Sub,
    SubToClashR,
    SurgeToClash,
    GetRuleset,
    GetProfile,
    QxScript,
    QxRewrite,
    Render,
    Convert,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Sub,
        Endpoint::SubToClashR,
        Endpoint::SurgeToClash,
        Endpoint::GetRuleset,
        Endpoint::GetProfile,
        Endpoint::QxScript,
        Endpoint::QxRewrite,
        Endpoint::Render,
        Endpoint::Convert,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Sub => "/sub",
            Endpoint::SubToClashR => "/sub2clashr",
            Endpoint::SurgeToClash => "/surge2clash",
            Endpoint::GetRuleset => "/getruleset",
            Endpoint::GetProfile => "/getprofile",
            Endpoint::QxScript => "/qx-script",
            Endpoint::QxRewrite => "/qx-rewrite",
            Endpoint::Render => "/render",
            Endpoint::Convert => "/convert",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Everything a converter may read for one request.
pub struct ConvertContext<'a> {
    pub request: &'a Request,
    pub state: Arc<RuntimeState>,
    pub rulesets: Arc<Generation>,
    pub templates: Arc<BTreeMap<String, Arc<str>>>,
}

impl<'a> ConvertContext<'a> {
    /// Take the current snapshots from `controller`.
    pub fn snapshot(request: &'a Request, controller: &ConfigController) -> Self {
        Self {
            request,
            state: controller.state(),
            rulesets: controller.rulesets().read(),
            templates: controller.templates().snapshot(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("conversion failed: {0}")]
    Failed(String),
}

/// A format converter.
///
/// Implementations write the result into `response`; they may set any
/// status. Returning `Err` turns the request into a 500.
pub trait Converter: Send + Sync {
    fn convert<'a>(
        &'a self,
        endpoint: Endpoint,
        ctx: ConvertContext<'a>,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), ConvertError>>;
}
