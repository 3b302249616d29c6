use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Probability
// ---------------------------------------------------------------------------

/// A stated confidence in the closed interval [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

impl Probability {
    pub fn new(p: f64) -> Result<Self, AppError> {
        if (0.0..=1.0).contains(&p) {
            Ok(Self(p))
        } else {
            Err(AppError::Validation(format!(
                "probability must be between 0 and 1, got {p}"
            )))
        }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl TryFrom<f64> for Probability {
    type Error = AppError;

    fn try_from(p: f64) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> f64 {
        p.0
    }
}

impl std::fmt::Display for Probability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.percent())
    }
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

/// Resolution state. The outcome only exists once a forecast is resolved,
/// and a resolved forecast never goes back to `Unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Unresolved,
    /// `outcome = true` means the predicted event occurred.
    Resolved { outcome: bool },
}

impl Resolution {
    /// Rebuild from the flat `(resolved, outcome)` pair used on the wire and in SQLite.
    pub fn from_parts(resolved: bool, outcome: Option<bool>) -> Result<Self, AppError> {
        match (resolved, outcome) {
            (false, None) => Ok(Resolution::Unresolved),
            (true, Some(outcome)) => Ok(Resolution::Resolved { outcome }),
            (true, None) => Err(AppError::InvalidRecord(
                "resolved forecast has no outcome".to_string(),
            )),
            (false, Some(_)) => Err(AppError::InvalidRecord(
                "unresolved forecast carries an outcome".to_string(),
            )),
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }

    pub fn outcome(self) -> Option<bool> {
        match self {
            Resolution::Unresolved => None,
            Resolution::Resolved { outcome } => Some(outcome),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForecastWire", into = "ForecastWire")]
pub struct Forecast {
    pub id: Uuid,
    pub description: String,
    pub probability: Probability,
    pub created_at: DateTime<Utc>,
    /// Informational deadline, never read by the calibration engine.
    pub resolve_by: Option<DateTime<Utc>>,
    pub resolution: Resolution,
}

impl Forecast {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_resolved()
    }
}

/// Flat JSON shape: `{id, description, probability, created_at, resolve_by, resolved, outcome}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForecastWire {
    id: Uuid,
    description: String,
    probability: Probability,
    created_at: DateTime<Utc>,
    resolve_by: Option<DateTime<Utc>>,
    resolved: bool,
    outcome: Option<bool>,
}

impl TryFrom<ForecastWire> for Forecast {
    type Error = AppError;

    fn try_from(w: ForecastWire) -> Result<Self, Self::Error> {
        Ok(Forecast {
            id: w.id,
            description: w.description,
            probability: w.probability,
            created_at: w.created_at,
            resolve_by: w.resolve_by,
            resolution: Resolution::from_parts(w.resolved, w.outcome)?,
        })
    }
}

impl From<Forecast> for ForecastWire {
    fn from(f: Forecast) -> Self {
        ForecastWire {
            id: f.id,
            description: f.description,
            probability: f.probability,
            created_at: f.created_at,
            resolve_by: f.resolve_by,
            resolved: f.resolution.is_resolved(),
            outcome: f.resolution.outcome(),
        }
    }
}

/// Body of `POST /predictions`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewForecast {
    pub description: String,
    pub probability: Probability,
    #[serde(default)]
    pub resolve_by: Option<DateTime<Utc>>,
}

/// Body of `PATCH /predictions/:id`. Resolution state is not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastPatch {
    pub description: Option<String>,
    pub probability: Option<Probability>,
    /// Absent: keep. `null`: clear. A timestamp: set.
    #[serde(default, deserialize_with = "present")]
    pub resolve_by: Option<Option<DateTime<Utc>>>,
}

/// Wrap any value that is present in the body, `null` included, in `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body of `POST /predictions/:id/resolve`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequest {
    pub outcome: Option<bool>,
}

// ---------------------------------------------------------------------------
// Statistics report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    /// Human label such as "60%-70%".
    pub range: String,
    pub count: usize,
    /// Percentage (0-100) of forecasts in this bin whose outcome was true.
    pub actual_frequency: f64,
    /// Mean stated probability of the bin's forecasts, as a percentage.
    pub avg_predicted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub total_predictions: usize,
    pub resolved_predictions: usize,
    /// `None` (serialized as null) when nothing is resolved.
    pub brier_score: Option<f64>,
    pub calibration_bins: Vec<CalibrationBin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
}

/// Query string of `GET /predictions/stats`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StatsOptions {
    #[serde(default)]
    pub include_summary: bool,
}

// ---------------------------------------------------------------------------
// Narrative side types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub description: String,
    /// Suggested starting confidence, in percent.
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightResponse {
    pub id: Uuid,
    pub insight: String,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub notes: Option<String>,
}
