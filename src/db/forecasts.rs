use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::models::ForecastRow;
use crate::error::{AppError, Result};
use crate::types::{Forecast, ForecastPatch, NewForecast, Resolution};

const SELECT_FORECAST: &str = r#"
    SELECT id, description, probability, created_at, resolve_by, resolved, outcome
    FROM forecasts
"#;

/// All forecasts, newest first. This is the snapshot the calibration engine consumes.
pub async fn list_forecasts(pool: &SqlitePool) -> Result<Vec<Forecast>> {
    let rows = sqlx::query_as::<_, ForecastRow>(&format!(
        "{SELECT_FORECAST} ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Forecast::try_from).collect()
}

pub async fn get_forecast(pool: &SqlitePool, id: Uuid) -> Result<Forecast> {
    let row = sqlx::query_as::<_, ForecastRow>(&format!("{SELECT_FORECAST} WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(id))?;

    Forecast::try_from(row)
}

pub async fn create_forecast(pool: &SqlitePool, new: NewForecast) -> Result<Forecast> {
    let forecast = Forecast {
        id: Uuid::new_v4(),
        description: validate_description(&new.description)?,
        probability: new.probability,
        created_at: Utc::now(),
        resolve_by: new.resolve_by,
        resolution: Resolution::Unresolved,
    };

    insert_forecast(pool, &forecast).await?;
    info!(
        event = "FORECAST_CREATED",
        id = %forecast.id,
        probability = forecast.probability.value(),
        "created forecast {} at {}",
        forecast.id, forecast.probability,
    );
    Ok(forecast)
}

/// Insert a fully built forecast, including its resolution state.
pub(crate) async fn insert_forecast(pool: &SqlitePool, f: &Forecast) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO forecasts (id, description, probability, created_at, resolve_by, resolved, outcome)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(f.id.to_string())
    .bind(&f.description)
    .bind(f.probability.value())
    .bind(f.created_at)
    .bind(f.resolve_by)
    .bind(f.resolution.is_resolved())
    .bind(f.resolution.outcome())
    .execute(pool)
    .await?;
    Ok(())
}

/// Edit description, probability or deadline. Resolution state is untouched.
pub async fn update_forecast(pool: &SqlitePool, id: Uuid, patch: ForecastPatch) -> Result<Forecast> {
    let mut forecast = get_forecast(pool, id).await?;

    if let Some(description) = patch.description {
        forecast.description = validate_description(&description)?;
    }
    if let Some(probability) = patch.probability {
        forecast.probability = probability;
    }
    if let Some(resolve_by) = patch.resolve_by {
        forecast.resolve_by = resolve_by;
    }

    sqlx::query("UPDATE forecasts SET description = ?, probability = ?, resolve_by = ? WHERE id = ?")
        .bind(&forecast.description)
        .bind(forecast.probability.value())
        .bind(forecast.resolve_by)
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(forecast)
}

/// One-way transition to resolved. A second attempt fails with `AlreadyResolved`.
pub async fn resolve_forecast(pool: &SqlitePool, id: Uuid, outcome: bool) -> Result<Forecast> {
    let result = sqlx::query(
        "UPDATE forecasts SET resolved = 1, outcome = ? WHERE id = ? AND resolved = 0",
    )
    .bind(outcome)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Either missing (get_forecast reports NotFound) or already resolved.
        let existing = get_forecast(pool, id).await?;
        if existing.is_resolved() {
            return Err(AppError::AlreadyResolved(id));
        }
    }

    info!(event = "FORECAST_RESOLVED", id = %id, outcome, "resolved forecast {id}");
    get_forecast(pool, id).await
}

pub async fn delete_forecast(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM forecasts WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(id));
    }
    Ok(())
}

pub async fn count_forecasts(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forecasts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn validate_description(s: &str) -> Result<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("description must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::types::Probability;

    fn new_forecast(description: &str, p: f64) -> NewForecast {
        NewForecast {
            description: description.to_string(),
            probability: Probability::new(p).unwrap(),
            resolve_by: None,
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let pool = test_pool().await;
        let created = create_forecast(&pool, new_forecast("  It will rain  ", 0.3)).await.unwrap();
        assert_eq!(created.description, "It will rain");
        assert!(!created.is_resolved());

        let fetched = get_forecast(&pool, created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.probability.value(), 0.3);
        assert_eq!(fetched.resolution, Resolution::Unresolved);
    }

    #[tokio::test]
    async fn empty_description_is_rejected() {
        let pool = test_pool().await;
        let err = create_forecast(&pool, new_forecast("   ", 0.5)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(count_forecasts(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let pool = test_pool().await;
        let first = create_forecast(&pool, new_forecast("first", 0.1)).await.unwrap();
        let second = create_forecast(&pool, new_forecast("second", 0.2)).await.unwrap();

        let all = list_forecasts(&pool).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn resolve_is_one_way() {
        let pool = test_pool().await;
        let f = create_forecast(&pool, new_forecast("ship it", 0.8)).await.unwrap();

        let resolved = resolve_forecast(&pool, f.id, true).await.unwrap();
        assert_eq!(resolved.resolution, Resolution::Resolved { outcome: true });

        let err = resolve_forecast(&pool, f.id, false).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyResolved(id) if id == f.id));

        let still = get_forecast(&pool, f.id).await.unwrap();
        assert_eq!(still.resolution, Resolution::Resolved { outcome: true });
    }

    #[tokio::test]
    async fn resolving_unknown_id_is_not_found() {
        let pool = test_pool().await;
        let missing = Uuid::new_v4();
        let err = resolve_forecast(&pool, missing, true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn update_leaves_resolution_alone() {
        let pool = test_pool().await;
        let f = create_forecast(&pool, new_forecast("old text", 0.4)).await.unwrap();
        resolve_forecast(&pool, f.id, false).await.unwrap();

        let patch = ForecastPatch {
            description: Some("new text".to_string()),
            probability: Some(Probability::new(0.45).unwrap()),
            resolve_by: None,
        };
        let updated = update_forecast(&pool, f.id, patch).await.unwrap();
        assert_eq!(updated.description, "new text");
        assert_eq!(updated.probability.value(), 0.45);
        assert_eq!(updated.resolution, Resolution::Resolved { outcome: false });
    }

    #[tokio::test]
    async fn deadline_can_be_set_kept_and_cleared() {
        let pool = test_pool().await;
        let f = create_forecast(&pool, new_forecast("renew passport", 0.6)).await.unwrap();
        let deadline = Utc::now() + chrono::Duration::days(30);

        let set = ForecastPatch { resolve_by: Some(Some(deadline)), ..Default::default() };
        update_forecast(&pool, f.id, set).await.unwrap();
        assert!(get_forecast(&pool, f.id).await.unwrap().resolve_by.is_some());

        let untouched = ForecastPatch {
            description: Some("renew passport early".to_string()),
            ..Default::default()
        };
        update_forecast(&pool, f.id, untouched).await.unwrap();
        assert!(get_forecast(&pool, f.id).await.unwrap().resolve_by.is_some());

        let clear = ForecastPatch { resolve_by: Some(None), ..Default::default() };
        let updated = update_forecast(&pool, f.id, clear).await.unwrap();
        assert!(updated.resolve_by.is_none());
        assert!(get_forecast(&pool, f.id).await.unwrap().resolve_by.is_none());
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let pool = test_pool().await;
        let f = create_forecast(&pool, new_forecast("temp", 0.5)).await.unwrap();
        delete_forecast(&pool, f.id).await.unwrap();
        assert!(matches!(get_forecast(&pool, f.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(delete_forecast(&pool, f.id).await, Err(AppError::NotFound(_))));
    }
}
