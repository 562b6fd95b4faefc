//! Startup orchestration.
//!
//! # Responsibilities
//! - Parse the command line, including the legacy `-cfw` flag
//! - Load preferences and perform the startup ruleset refresh
//! - Pick between generator mode and server mode
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Preference load failures are not fatal; defaults are served
//! - Route registration and bind failures are fatal and return 1
//! - Environment overrides are applied in server mode only

use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use crate::config::{ConfigController, EnvOverrides, LaunchFlags};
use crate::convert::{BuiltinConverter, Converter, Generator, TemplateSet};
use crate::http::{register_routes, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::Listener;
use crate::observability::metrics;
use crate::ruleset::{FetchError, Fetcher, HttpFetcher, RulesetStore, DEFAULT_FETCH_TIMEOUT};

pub const DEFAULT_PREFERENCE_FILE: &str = "pref.toml";

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "subconverter", version, about = "Subscription converter backend")]
pub struct LaunchOptions {
    /// Child-worker mode: refresh rulesets on every request instead of at startup.
    #[arg(long = "cfw")]
    pub child_worker: bool,

    /// Preference file.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Generate the configured artifacts and exit.
    #[arg(short = 'g', long = "gen")]
    pub generate: bool,

    /// Only generate this artifact.
    #[arg(long, value_name = "NAME")]
    pub artifact: Option<String>,

    /// Write logs to this file instead of stdout.
    #[arg(short = 'l', long = "log", value_name = "PATH")]
    pub log: Option<PathBuf>,
}

impl LaunchOptions {
    /// Parse `args` (program name first). `-cfw` is accepted as `--cfw`.
    pub fn parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(args.into_iter().map(|arg| {
            let arg = arg.into();
            if arg == "-cfw" {
                OsString::from("--cfw")
            } else {
                arg
            }
        }))
    }

    pub fn mode(&self) -> Mode {
        if self.generate {
            Mode::Generator {
                artifact: self.artifact.clone(),
            }
        } else {
            Mode::Server
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Server,
    Generator { artifact: Option<String> },
}

/// The pluggable parts: how origins are fetched and how formats are converted.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub converter: Arc<dyn Converter>,
}

impl Collaborators {
    /// HTTP fetcher plus the built-in converter.
    pub fn builtin() -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: Arc::new(HttpFetcher::new(DEFAULT_FETCH_TIMEOUT)?),
            converter: Arc::new(BuiltinConverter),
        })
    }
}

/// Run the process to completion and return its exit code.
pub async fn run(
    options: LaunchOptions,
    env: EnvOverrides,
    collaborators: Collaborators,
    shutdown: Shutdown,
) -> i32 {
    let mode = options.mode();
    let path = resolve_preference_path(options.file.as_deref());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        preference = %path.display(),
        ?mode,
        child_worker = options.child_worker,
        "subconverter starting"
    );

    let Collaborators { fetcher, converter } = collaborators;
    let mut controller = ConfigController::bootstrap(
        path,
        LaunchFlags {
            child_process: options.child_worker,
        },
        Arc::new(RulesetStore::new(Arc::clone(&fetcher))),
        Arc::new(TemplateSet::new(Arc::clone(&fetcher))),
    )
    .await;

    // Generation never listens, so only the port override is left out.
    let env = match mode {
        Mode::Generator { .. } => EnvOverrides { port: None, ..env },
        Mode::Server => env,
    };
    controller.apply_overrides(env);

    if !controller.state().update_ruleset_on_request {
        controller.refresh_rulesets().await;
    }

    if let Mode::Generator { artifact } = mode {
        let generator = Generator::new(converter, Arc::new(controller));
        let mut stop = shutdown.subscribe();
        return tokio::select! {
            code = generator.run(artifact.as_deref()) => code,
            _ = stop.cancelled() => {
                tracing::warn!("Generation interrupted");
                1
            }
        };
    }

    let controller = Arc::new(controller);
    let server = controller.server_config().clone();

    let routes = match register_routes(&controller, converter, fetcher) {
        Ok(routes) => routes,
        Err(e) => {
            tracing::error!(fatal = true, error = %e, "Route registration failed");
            return 1;
        }
    };

    start_metrics(&controller.state().preferences.advanced.metrics_address);

    let listener = match Listener::bind(&server) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(fatal = true, error = %e, "Failed to start listener");
            return 1;
        }
    };

    HttpServer::new(Arc::new(routes), server.max_body_size)
        .run(listener, shutdown.subscribe())
        .await;
    tracing::info!("Shutdown complete");
    0
}

/// Default to `pref.toml`. When the file exists, move into its directory so
/// relative paths inside it resolve next to it. The returned path is absolute
/// in that case.
fn resolve_preference_path(file: Option<&Path>) -> PathBuf {
    let path = file.unwrap_or(Path::new(DEFAULT_PREFERENCE_FILE)).to_path_buf();
    if !path.is_file() {
        tracing::warn!(path = %path.display(), "Preference file not found");
        return path;
    }

    let absolute = match std::fs::canonicalize(&path) {
        Ok(absolute) => absolute,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot resolve preference path");
            return path;
        }
    };
    if let Some(dir) = absolute.parent() {
        if let Err(e) = std::env::set_current_dir(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot enter preference directory");
        }
    }
    absolute
}

fn start_metrics(address: &str) {
    if address.is_empty() {
        return;
    }
    match address.parse::<SocketAddr>() {
        Ok(addr) => {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(address, error = %e, "Failed to start metrics exporter");
            }
        }
        Err(e) => tracing::error!(address, error = %e, "Invalid metrics address"),
    }
}
