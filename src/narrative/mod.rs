//! Best-effort narrative enrichment. Runs after the numeric report is
//! complete and can only ever add `ai_summary`; it never fails a request.

pub mod gemini;
pub mod prompts;
pub mod telemetry;

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::types::{Forecast, StatsReport, Suggestion};

pub use gemini::GeminiNarrator;
pub use telemetry::{CallOutcome, Telemetry};

/// Free-text generator injected into the API layer.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn calibration_summary(&self, report: &StatsReport) -> Result<String>;

    async fn forecast_insight(&self, forecast: &Forecast) -> Result<String>;

    async fn suggest_forecasts(&self, past: &[String]) -> Result<Vec<Suggestion>>;
}

/// Run a generator call under `timeout`, recording latency and outcome.
pub async fn bounded<T, F>(timeout: Duration, telemetry: &Telemetry, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = tokio::time::timeout(timeout, call).await;
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(value)) => {
            telemetry.record(elapsed, CallOutcome::Ok);
            Ok(value)
        }
        Ok(Err(e)) => {
            telemetry.record(elapsed, CallOutcome::Failed);
            Err(e)
        }
        Err(_) => {
            telemetry.record(elapsed, CallOutcome::TimedOut);
            Err(AppError::Narrative(format!(
                "generator timed out after {}ms",
                timeout.as_millis()
            )))
        }
    }
}

/// Attach `ai_summary` to an already computed report.
///
/// Success sets the field; a missing generator, an error or a timeout leaves
/// it `None`. Numeric fields are never touched.
pub async fn enrich(
    mut report: StatsReport,
    narrator: Option<&dyn Narrator>,
    timeout: Duration,
    telemetry: &Telemetry,
) -> StatsReport {
    let Some(narrator) = narrator else {
        debug!("summary requested but no narrative generator is configured");
        telemetry.record_skipped();
        report.ai_summary = None;
        return report;
    };

    let summary = match bounded(timeout, telemetry, narrator.calibration_summary(&report)).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            warn!(event = "SUMMARY_EMPTY", "narrative generator returned an empty summary");
            None
        }
        Err(e) => {
            warn!(event = "SUMMARY_FAILED", error = %e, "calibration summary unavailable: {e}");
            None
        }
    };
    report.ai_summary = summary;
    report
}

/// Insight for one forecast. Unlike the summary this is the whole response,
/// so an unavailable generator is an error.
pub async fn insight(
    forecast: &Forecast,
    narrator: Option<&dyn Narrator>,
    timeout: Duration,
    telemetry: &Telemetry,
) -> Result<String> {
    let Some(narrator) = narrator else {
        telemetry.record_skipped();
        return Err(AppError::Narrative("narrative generator is not configured".to_string()));
    };
    bounded(timeout, telemetry, narrator.forecast_insight(forecast))
        .await
        .map(|text| text.trim().to_string())
}

/// Suggested forecasts, falling back to a fixed list on any failure.
pub async fn suggestions(
    past: &[String],
    narrator: Option<&dyn Narrator>,
    timeout: Duration,
    telemetry: &Telemetry,
) -> Vec<Suggestion> {
    let Some(narrator) = narrator else {
        telemetry.record_skipped();
        return prompts::fallback_suggestions();
    };
    match bounded(timeout, telemetry, narrator.suggest_forecasts(past)).await {
        Ok(list) if !list.is_empty() => list,
        Ok(_) => prompts::fallback_suggestions(),
        Err(e) => {
            warn!(event = "SUGGESTIONS_FAILED", error = %e, "using fallback suggestions: {e}");
            prompts::fallback_suggestions()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubNarrator;
    use super::*;
    use crate::calibration::compute_report;
    use crate::calibration::test_support::forecast;

    const SHORT: Duration = Duration::from_millis(50);

    fn report() -> StatsReport {
        compute_report(&[
            forecast(0.9, Some(true)),
            forecast(0.2, Some(false)),
            forecast(0.5, None),
        ])
    }

    /// Everything except the summary must match the plain engine output.
    fn assert_numeric_fields_match(enriched: &StatsReport, base: &StatsReport) {
        assert_eq!(enriched.total_predictions, base.total_predictions);
        assert_eq!(enriched.resolved_predictions, base.resolved_predictions);
        assert_eq!(enriched.brier_score, base.brier_score);
        assert_eq!(enriched.calibration_bins, base.calibration_bins);
    }

    #[tokio::test]
    async fn successful_summary_is_attached() {
        let telemetry = Telemetry::new();
        let stub = StubNarrator::Replies("  Nicely calibrated.  ".to_string());
        let base = report();

        let enriched = enrich(base.clone(), Some(&stub), SHORT, &telemetry).await;
        assert_eq!(enriched.ai_summary.as_deref(), Some("Nicely calibrated."));
        assert_numeric_fields_match(&enriched, &base);
        assert_eq!(telemetry.ok(), 1);
    }

    #[tokio::test]
    async fn failure_leaves_summary_absent() {
        let telemetry = Telemetry::new();
        let base = report();

        let enriched = enrich(base.clone(), Some(&StubNarrator::Fails), SHORT, &telemetry).await;
        assert!(enriched.ai_summary.is_none());
        assert_numeric_fields_match(&enriched, &base);
        assert_eq!(telemetry.failed(), 1);
    }

    #[tokio::test]
    async fn timeout_leaves_summary_absent() {
        let telemetry = Telemetry::new();
        let base = report();

        let started = Instant::now();
        let enriched = enrich(base.clone(), Some(&StubNarrator::Hangs), SHORT, &telemetry).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(enriched.ai_summary.is_none());
        assert_numeric_fields_match(&enriched, &base);
        assert_eq!(telemetry.timed_out(), 1);
    }

    #[tokio::test]
    async fn missing_generator_is_skipped() {
        let telemetry = Telemetry::new();
        let enriched = enrich(report(), None, SHORT, &telemetry).await;
        assert!(enriched.ai_summary.is_none());
        assert_eq!(telemetry.skipped(), 1);
        assert_eq!(telemetry.sample_count(), 0);
    }

    #[tokio::test]
    async fn blank_summary_is_dropped() {
        let telemetry = Telemetry::new();
        let stub = StubNarrator::Replies("   ".to_string());
        let enriched = enrich(report(), Some(&stub), SHORT, &telemetry).await;
        assert!(enriched.ai_summary.is_none());
    }

    #[tokio::test]
    async fn insight_requires_a_generator() {
        let telemetry = Telemetry::new();
        let f = forecast(0.6, None);
        assert!(matches!(
            insight(&f, None, SHORT, &telemetry).await,
            Err(AppError::Narrative(_))
        ));

        let stub = StubNarrator::Replies("Looks reasonable.\n".to_string());
        assert_eq!(insight(&f, Some(&stub), SHORT, &telemetry).await.unwrap(), "Looks reasonable.");
    }

    #[tokio::test]
    async fn suggestions_fall_back_on_bad_output() {
        let telemetry = Telemetry::new();
        let garbage = StubNarrator::Replies("not json".to_string());
        let got = suggestions(&[], Some(&garbage), SHORT, &telemetry).await;
        assert_eq!(got, prompts::fallback_suggestions());

        let got = suggestions(&[], Some(&StubNarrator::Hangs), SHORT, &telemetry).await;
        assert_eq!(got, prompts::fallback_suggestions());

        let good = StubNarrator::Replies(r#"[{"description": "x", "confidence": 45}]"#.to_string());
        let got = suggestions(&[], Some(&good), SHORT, &telemetry).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].description, "x");
    }
}
