//! subconverter backend.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::listener ──▶ http::server ──▶ routing::RouteTable
//!                     (worker permit)   (axum adapter)   (exact match)
//!                                                              │
//!                        ┌──────────────┬──────────────────────┤
//!                        ▼              ▼                      ▼
//!                   admin::auth   config::controller     convert::Converter
//!                   (Guard)       (load/reload/update)   (ruleset snapshot)
//!                                       │                      │
//!                                       └────▶ ruleset::store ◀┘
//!                                             (generations)
//!
//!     lifecycle: signals ──▶ Shutdown ──▶ listener stop + drain
//! ```

use std::process::ExitCode;

use subconverter::config::EnvOverrides;
use subconverter::lifecycle::signals;
use subconverter::observability::logging;
use subconverter::{Collaborators, LaunchOptions, Shutdown};

#[tokio::main]
async fn main() -> ExitCode {
    let options = match LaunchOptions::parse_args(std::env::args_os()) {
        Ok(options) => options,
        Err(e) => e.exit(),
    };

    if let Err(e) = logging::init(options.log.as_deref()) {
        eprintln!("subconverter: {e}");
        return ExitCode::FAILURE;
    }

    let shutdown = Shutdown::new();
    match signals::install() {
        Ok(installed) => {
            signals::watch_signals(installed, shutdown.clone());
        }
        Err(e) => {
            tracing::error!(fatal = true, error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    }

    let collaborators = match Collaborators::builtin() {
        Ok(collaborators) => collaborators,
        Err(e) => {
            tracing::error!(fatal = true, error = %e, "Failed to initialise HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let code = subconverter::run(options, EnvOverrides::from_env(), collaborators, shutdown).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
