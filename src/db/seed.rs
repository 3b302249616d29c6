use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::forecasts::{count_forecasts, insert_forecast};
use crate::error::Result;
use crate::types::{Forecast, Probability, Resolution};

/// (description, probability, outcome). `None` = still open.
const DEMO_FORECASTS: &[(&str, f64, Option<bool>)] = &[
    ("I will finish reading my current book this week", 0.75, None),
    ("It will rain tomorrow", 0.30, None),
    ("I will exercise at least 3 times this week", 0.65, None),
    ("My favorite team will win their next game", 0.55, None),
    ("I will complete my iOS project by the deadline", 0.85, None),
    ("I will learn a new programming language this month", 0.40, None),
    ("I thought it would be sunny yesterday", 0.70, Some(true)),
    ("I predicted I would wake up before 8am", 0.50, Some(false)),
    ("I thought my package would arrive on time", 0.80, Some(true)),
    ("I predicted I would go to the gym", 0.60, Some(false)),
    ("I thought the meeting would be cancelled", 0.20, Some(false)),
    ("I predicted my friend would call me back", 0.90, Some(true)),
    ("I thought I would finish my homework early", 0.45, Some(true)),
    ("I predicted the restaurant would be crowded", 0.70, Some(true)),
];

/// Load the demo set into an empty store. Returns how many forecasts were inserted.
/// A non-empty store is left untouched.
pub async fn seed_demo(pool: &SqlitePool) -> Result<usize> {
    let existing = count_forecasts(pool).await?;
    if existing > 0 {
        warn!("SEED_DEMO set but store already holds {existing} forecasts; skipping demo data");
        return Ok(0);
    }

    let now = Utc::now();
    let n = DEMO_FORECASTS.len() as i64;
    for (i, &(description, p, outcome)) in DEMO_FORECASTS.iter().enumerate() {
        let forecast = Forecast {
            id: Uuid::new_v4(),
            description: description.to_string(),
            probability: Probability::new(p)?,
            // Later entries are newer, matching insertion order.
            created_at: now - Duration::minutes(n - i as i64),
            resolve_by: None,
            resolution: match outcome {
                Some(outcome) => Resolution::Resolved { outcome },
                None => Resolution::Unresolved,
            },
        };
        insert_forecast(pool, &forecast).await?;
    }

    info!("Loaded {} demo forecasts", DEMO_FORECASTS.len());
    Ok(DEMO_FORECASTS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::compute_report;
    use crate::db::forecasts::list_forecasts;
    use crate::db::test_pool;

    #[tokio::test]
    async fn seeds_once_into_empty_store() {
        let pool = test_pool().await;
        assert_eq!(seed_demo(&pool).await.unwrap(), 14);
        assert_eq!(seed_demo(&pool).await.unwrap(), 0);
        assert_eq!(count_forecasts(&pool).await.unwrap(), 14);
    }

    #[tokio::test]
    async fn demo_set_produces_a_populated_report() {
        let pool = test_pool().await;
        seed_demo(&pool).await.unwrap();

        let snapshot = list_forecasts(&pool).await.unwrap();
        assert_eq!(snapshot[0].description, "I predicted the restaurant would be crowded");

        let report = compute_report(&snapshot);
        assert_eq!(report.total_predictions, 14);
        assert_eq!(report.resolved_predictions, 8);
        let bins: usize = report.calibration_bins.iter().map(|b| b.count).sum();
        assert_eq!(bins, 8);

        // Two resolved forecasts at 0.70, both happened.
        let seventy = report
            .calibration_bins
            .iter()
            .find(|b| b.range == "70%-80%")
            .expect("70%-80% bin");
        assert_eq!(seventy.count, 2);
        assert!((seventy.actual_frequency - 100.0).abs() < 1e-9);
    }
}
