use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::narrative::{prompts, Narrator};
use crate::types::{Forecast, StatsReport, Suggestion};

// ---------------------------------------------------------------------------
// generateContent wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Narrative generator backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiNarrator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiNarrator {
    pub fn new(api_key: String, api_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/models/{}:generateContent", api_url.trim_end_matches('/'), model),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        match &cfg.gemini_api_key {
            Some(key) => Ok(Some(Self::new(
                key.clone(),
                &cfg.gemini_api_url,
                &cfg.gemini_model,
                cfg.summary_timeout,
            )?)),
            None => Ok(None),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Narrative(format!("{status}: {}", snippet(&text))));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        let out = first_candidate_text(parsed)?;
        debug!(chars = out.len(), "gemini reply received");
        Ok(out)
    }
}

#[async_trait]
impl Narrator for GeminiNarrator {
    async fn calibration_summary(&self, report: &StatsReport) -> Result<String> {
        self.generate(&prompts::calibration_summary_prompt(report)).await
    }

    async fn forecast_insight(&self, forecast: &Forecast) -> Result<String> {
        self.generate(&prompts::forecast_insight_prompt(forecast)).await
    }

    async fn suggest_forecasts(&self, past: &[String]) -> Result<Vec<Suggestion>> {
        let text = self.generate(&prompts::suggestions_prompt(past)).await?;
        prompts::parse_suggestions(&text)
    }
}

fn first_candidate_text(resp: GenerateResponse) -> Result<String> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Narrative("response contained no text".to_string()));
    }
    Ok(text)
}

fn snippet(s: &str) -> &str {
    match s.char_indices().nth(200) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
