//! Database row types matching `migrations/`.
//! Used by sqlx for typed queries.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::types::{Forecast, Probability, Resolution};

#[derive(Debug, sqlx::FromRow)]
pub struct ForecastRow {
    pub id: String,
    pub description: String,
    pub probability: f64,
    pub created_at: DateTime<Utc>,
    pub resolve_by: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub outcome: Option<bool>,
}

/// The store-to-engine boundary: rows that break the forecast invariants
/// are rejected here, never inside the scoring loop.
impl TryFrom<ForecastRow> for Forecast {
    type Error = AppError;

    fn try_from(row: ForecastRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| AppError::InvalidRecord(format!("bad id {:?}: {e}", row.id)))?;
        let probability = Probability::new(row.probability)
            .map_err(|e| AppError::InvalidRecord(format!("forecast {id}: {e}")))?;
        let resolution = Resolution::from_parts(row.resolved, row.outcome)
            .map_err(|e| AppError::InvalidRecord(format!("forecast {id}: {e}")))?;

        Ok(Forecast {
            id,
            description: row.description,
            probability,
            created_at: row.created_at,
            resolve_by: row.resolve_by,
            resolution,
        })
    }
}
