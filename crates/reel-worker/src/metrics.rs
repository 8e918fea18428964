//! Pipeline metrics.
//!
//! - Candidate checks by outcome
//! - Synthesis attempts and rate-limit retries
//! - Render status polls by reported state
//! - Stage durations

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Metric name constants for consistency.
pub mod names {
    pub const VARIANT_CHECKS_TOTAL: &str = "reel_variant_checks_total";
    pub const SYNTHESIS_ATTEMPTS_TOTAL: &str = "reel_synthesis_attempts_total";
    pub const SYNTHESIS_RETRIES_TOTAL: &str = "reel_synthesis_retries_total";
    pub const RENDER_POLLS_TOTAL: &str = "reel_render_polls_total";
    pub const STAGE_DURATION_SECONDS: &str = "reel_stage_duration_seconds";
}

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(port: u16) -> Result<(), String> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus recorder: {}", e))
}

/// Record one candidate check; `outcome` is "qualified", "insufficient" or "error".
pub fn record_variant_check(outcome: &'static str) {
    counter!(names::VARIANT_CHECKS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_synthesis_attempt(segment: &str, outcome: &'static str) {
    counter!(
        names::SYNTHESIS_ATTEMPTS_TOTAL,
        "segment" => segment.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_synthesis_retry(segment: &str) {
    counter!(
        names::SYNTHESIS_RETRIES_TOTAL,
        "segment" => segment.to_string()
    )
    .increment(1);
}

pub fn record_render_poll(state: &str) {
    let state = if state.is_empty() { "unknown" } else { state };
    counter!(names::RENDER_POLLS_TOTAL, "state" => state.to_lowercase()).increment(1);
}

pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    histogram!(
        names::STAGE_DURATION_SECONDS,
        "stage" => stage.to_string()
    )
    .record(duration_secs);
}
