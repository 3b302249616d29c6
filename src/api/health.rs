//! Response bodies for `/health` and `/stats/latency`, built from the
//! narrative telemetry shared with the enrichment step.

use std::time::Instant;

use serde::Serialize;

use crate::narrative::Telemetry;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub forecasts: i64,
    pub narrator_configured: bool,
    pub summaries_ok: u64,
    pub summaries_failed: u64,
    pub summaries_timed_out: u64,
    pub summaries_skipped: u64,
}

impl HealthResponse {
    pub fn build(
        started_at: Instant,
        forecasts: i64,
        narrator_configured: bool,
        telemetry: &Telemetry,
    ) -> Self {
        Self {
            status: "ok",
            uptime_secs: started_at.elapsed().as_secs(),
            forecasts,
            narrator_configured,
            summaries_ok: telemetry.ok(),
            summaries_failed: telemetry.failed(),
            summaries_timed_out: telemetry.timed_out(),
            summaries_skipped: telemetry.skipped(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub sample_count: u64,
}

impl LatencyResponse {
    pub fn from_telemetry(telemetry: &Telemetry) -> Self {
        let to_ms = |us: Option<u64>| us.map(|v| v as f64 / 1000.0);
        let (p50, p95, p99) = telemetry.percentiles();
        Self {
            p50_ms: to_ms(p50),
            p95_ms: to_ms(p95),
            p99_ms: to_ms(p99),
            sample_count: telemetry.sample_count(),
        }
    }
}
