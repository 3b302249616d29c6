use std::time::Duration;

use crate::error::{AppError, Result};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash-lite-preview-09-2025";

/// Number of equal-width calibration bins over [0, 1].
pub const NUM_BINS: usize = 10;

/// Width of a single calibration bin in probability units.
pub const BIN_WIDTH: f64 = 1.0 / NUM_BINS as f64;

/// Default upper bound on a single narrative generator call (seconds).
pub const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 10;

/// Suggestions returned by the generator are truncated to this many entries.
pub const MAX_SUGGESTIONS: usize = 3;

/// Past forecast descriptions included as context in the suggestions prompt.
pub const MAX_PAST_FORECASTS_IN_PROMPT: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Narrative generation is disabled when unset (GEMINI_API_KEY).
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_url: String,
    /// Caller-imposed bound on each narrative call (SUMMARY_TIMEOUT_SECS).
    pub summary_timeout: Duration,
    /// Load demo forecasts into an empty store at startup (SEED_DEMO).
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "calibr8.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| GEMINI_MODEL.to_string()),
            gemini_api_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| GEMINI_API_URL.to_string()),
            summary_timeout: Duration::from_secs(
                std::env::var("SUMMARY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DEFAULT_SUMMARY_TIMEOUT_SECS.to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        AppError::Config("SUMMARY_TIMEOUT_SECS must be a whole number of seconds".to_string())
                    })?,
            ),
            seed_demo: parse_flag(&std::env::var("SEED_DEMO").unwrap_or_default()),
        })
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
