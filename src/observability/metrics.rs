//! Metrics collection and exposition.
//!
//! # Metrics
//! - `subconverter_requests_total` (counter): dispatched requests by method, route, status
//! - `subconverter_request_duration_seconds` (histogram): dispatch latency by route
//! - `subconverter_ruleset_refreshes_total` (counter): completed refreshes
//! - `subconverter_ruleset_fetch_failures_total` (counter): entries that failed to fetch
//! - `subconverter_ruleset_refresh_duration_seconds` (histogram)
//! - `subconverter_rulesets` (gauge): entries in the current generation
//!
//! # Design Decisions
//! - The Prometheus exporter is only installed when `advanced.metrics_address`
//!   is set; otherwise every call below is a no-op
//! - Unmatched requests share one `route` label so scanners cannot grow the
//!   label set

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the global recorder and its scrape listener. Needs a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &Method, route: &str, status: StatusCode, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    metrics::counter!(
        "subconverter_requests_total",
        "method" => method.as_str().to_owned(),
        "route" => route.to_owned(),
        "status" => status.as_u16().to_string(),
    )
    .increment(1);
    metrics::histogram!(
        "subconverter_request_duration_seconds",
        "route" => route.to_owned(),
    )
    .record(elapsed);
}

pub fn record_ruleset_refresh(total: usize, failed: usize, start: Instant) {
    metrics::counter!("subconverter_ruleset_refreshes_total").increment(1);
    metrics::counter!("subconverter_ruleset_fetch_failures_total").increment(failed as u64);
    metrics::histogram!("subconverter_ruleset_refresh_duration_seconds")
        .record(start.elapsed().as_secs_f64());
    metrics::gauge!("subconverter_rulesets").set(total as f64);
}
