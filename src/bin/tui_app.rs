use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the server's JSON shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub id: String,
    pub description: String,
    pub probability: f64,
    pub created_at: String,
    pub resolved: bool,
    pub outcome: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinResponse {
    pub range: String,
    pub count: usize,
    pub actual_frequency: f64,
    pub avg_predicted: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatsResponse {
    pub total_predictions: usize,
    pub resolved_predictions: usize,
    pub brier_score: Option<f64>,
    pub calibration_bins: Vec<BinResponse>,
    #[serde(default)]
    pub ai_summary: Option<String>,
}

/// Narrative generator status from `/health`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub narrator_configured: Option<bool>,
    pub summaries_ok: Option<u64>,
    pub summaries_failed: Option<u64>,
    pub summaries_timed_out: Option<u64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub forecasts: Vec<ForecastResponse>,
    pub stats: StatsResponse,
    pub health: HealthResponse,
    /// Last summary fetched with `s`; kept across refreshes.
    pub summary: Option<String>,
    /// One-line feedback for the last key action.
    pub message: Option<String>,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            forecasts: Vec::new(),
            stats: StatsResponse::default(),
            health: HealthResponse::default(),
            summary: None,
            message: None,
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let forecasts_url = format!("{}/predictions", self.base_url);
        let stats_url = format!("{}/predictions/stats", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (forecasts_res, stats_res, health_res) = tokio::join!(
            client.get(&forecasts_url).send(),
            client.get(&stats_url).send(),
            client.get(&health_url).send(),
        );

        let (forecasts_resp, stats_resp) = match (forecasts_res, stats_res) {
            (Ok(f), Ok(s)) => (f, s),
            (Err(e), _) | (_, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        let (forecasts, stats) = tokio::join!(
            forecasts_resp.json::<Vec<ForecastResponse>>(),
            stats_resp.json::<StatsResponse>(),
        );

        match (forecasts, stats) {
            (Ok(f), Ok(s)) => {
                self.forecasts = f;
                self.stats = s;
                self.status = ConnectionStatus::Connected;

                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }

    /// Resolve the forecast at `index` in the current table, then refresh.
    pub async fn resolve(&mut self, client: &reqwest::Client, index: usize, outcome: bool) {
        let Some(forecast) = self.forecasts.get(index) else {
            return;
        };
        if forecast.resolved {
            self.message = Some("already resolved".to_string());
            return;
        }

        let url = format!("{}/predictions/{}/resolve", self.base_url, forecast.id);
        let label = truncate(&forecast.description, 40);
        let body = serde_json::json!({ "outcome": outcome });
        self.message = Some(match client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                format!("resolved \"{label}\" as {}", if outcome { "happened" } else { "did not happen" })
            }
            Ok(resp) => format!("resolve failed: {}", resp.status()),
            Err(e) => format!("resolve failed: {e}"),
        });

        self.refresh(client).await;
    }

    /// Ask the server for a stats report with a narrative summary.
    pub async fn fetch_summary(&mut self, client: &reqwest::Client) {
        let url = format!("{}/predictions/stats?include_summary=true", self.base_url);
        let result = match client.get(&url).send().await {
            Ok(resp) => resp.json::<StatsResponse>().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(report) => {
                self.message = match report.ai_summary {
                    Some(_) => None,
                    None => Some("summary unavailable".to_string()),
                };
                self.summary = report.ai_summary.clone();
                self.stats = report;
            }
            Err(e) => self.message = Some(format!("summary request failed: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_probability(p: f64) -> String {
    format!("{:.0}%", p * 100.0)
}

pub fn format_brier(score: Option<f64>) -> String {
    score.map_or("—".to_string(), |b| format!("{b:.4}"))
}

pub fn format_outcome(f: &ForecastResponse) -> &'static str {
    match (f.resolved, f.outcome) {
        (true, Some(true)) => "yes",
        (true, Some(false)) => "no",
        _ => "open",
    }
}

/// `YYYY-MM-DD` prefix of an RFC 3339 timestamp.
pub fn format_date(ts: &str) -> String {
    ts.chars().take(10).collect()
}

/// Gap between stated confidence and observed frequency, signed (+ = underconfident).
pub fn format_gap(bin: &BinResponse) -> String {
    format!("{:+.1}", bin.actual_frequency - bin.avg_predicted)
}

/// Header label for the generator: "off", or "ok/failed/timed-out" call counts.
pub fn format_generator(h: &HealthResponse) -> String {
    match h.narrator_configured {
        Some(true) => format!(
            "{}/{}/{}",
            h.summaries_ok.unwrap_or(0),
            h.summaries_failed.unwrap_or(0),
            h.summaries_timed_out.unwrap_or(0),
        ),
        Some(false) => "off".to_string(),
        None => "—".to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(resolved: bool, outcome: Option<bool>) -> ForecastResponse {
        ForecastResponse {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
            description: "x".to_string(),
            probability: 0.7,
            created_at: "2025-03-01T12:00:00Z".to_string(),
            resolved,
            outcome,
        }
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(format_probability(0.7), "70%");
        assert_eq!(format_probability(1.0), "100%");
        assert_eq!(format_brier(Some(0.123456)), "0.1235");
        assert_eq!(format_brier(None), "—");
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(format_outcome(&forecast(false, None)), "open");
        assert_eq!(format_outcome(&forecast(true, Some(true))), "yes");
        assert_eq!(format_outcome(&forecast(true, Some(false))), "no");
    }

    #[test]
    fn date_and_gap() {
        assert_eq!(format_date("2025-03-01T12:00:00Z"), "2025-03-01");
        let bin = BinResponse {
            range: "70%-80%".to_string(),
            count: 2,
            actual_frequency: 100.0,
            avg_predicted: 70.0,
        };
        assert_eq!(format_gap(&bin), "+30.0");
    }

    #[test]
    fn generator_label_from_health() {
        assert_eq!(format_generator(&HealthResponse::default()), "—");

        let off: HealthResponse =
            serde_json::from_str(r#"{"status":"ok","uptime_secs":3,"narrator_configured":false}"#)
                .unwrap();
        assert_eq!(format_generator(&off), "off");

        let on = HealthResponse {
            narrator_configured: Some(true),
            summaries_ok: Some(4),
            summaries_failed: Some(1),
            summaries_timed_out: None,
        };
        assert_eq!(format_generator(&on), "4/1/0");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn parses_stats_without_summary() {
        let s: StatsResponse = serde_json::from_str(
            r#"{"total_predictions": 0, "resolved_predictions": 0,
                "brier_score": null, "calibration_bins": []}"#,
        )
        .unwrap();
        assert!(s.brier_score.is_none());
        assert!(s.ai_summary.is_none());
    }
}
