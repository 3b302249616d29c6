use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::api::health::{HealthResponse, LatencyResponse};
use crate::calibration::compute_report;
use crate::db::{forecasts, profile};
use crate::error::{AppError, Result};
use crate::narrative::{self, Narrator, Telemetry};
use crate::types::{
    Forecast, ForecastPatch, InsightResponse, NewForecast, ProfilePatch, ResolveRequest,
    StatsOptions, StatsReport, Suggestion, UserProfile,
};

/// JSON body whose rejection surfaces as `AppError::InvalidBody` (400) instead of axum's 422.
type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub narrator: Option<Arc<dyn Narrator>>,
    pub telemetry: Arc<Telemetry>,
    pub summary_timeout: Duration,
    pub started_at: Instant,
}

impl ApiState {
    fn narrator(&self) -> Option<&dyn Narrator> {
        self.narrator.as_deref()
    }
}

pub fn router(state: ApiState) -> Router {
    let api = Router::new()
        .route("/predictions", get(list_predictions).post(create_prediction))
        .route("/predictions/stats", get(get_stats))
        .route("/predictions/suggestions", get(get_suggestions))
        .route(
            "/predictions/:id",
            get(get_prediction).patch(update_prediction).delete(delete_prediction),
        )
        .route("/predictions/:id/resolve", post(resolve_prediction))
        .route("/predictions/:id/insight", get(get_insight))
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency));

    Router::new().nest("/api", api).with_state(state)
}

// ---------------------------------------------------------------------------
// Forecast CRUD
// ---------------------------------------------------------------------------

async fn list_predictions(State(state): State<ApiState>) -> Result<Json<Vec<Forecast>>> {
    Ok(Json(forecasts::list_forecasts(&state.pool).await?))
}

async fn create_prediction(
    State(state): State<ApiState>,
    body: JsonBody<NewForecast>,
) -> Result<(StatusCode, Json<Forecast>)> {
    let Json(body) = body?;
    let forecast = forecasts::create_forecast(&state.pool, body).await?;
    Ok((StatusCode::CREATED, Json(forecast)))
}

async fn get_prediction(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Forecast>> {
    Ok(Json(forecasts::get_forecast(&state.pool, id).await?))
}

async fn update_prediction(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    patch: JsonBody<ForecastPatch>,
) -> Result<Json<Forecast>> {
    let Json(patch) = patch?;
    Ok(Json(forecasts::update_forecast(&state.pool, id, patch).await?))
}

async fn delete_prediction(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    forecasts::delete_forecast(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_prediction(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    body: JsonBody<ResolveRequest>,
) -> Result<Json<Forecast>> {
    let Json(body) = body?;
    let outcome = body
        .outcome
        .ok_or_else(|| AppError::Validation("outcome is required".to_string()))?;
    Ok(Json(forecasts::resolve_forecast(&state.pool, id, outcome).await?))
}

// ---------------------------------------------------------------------------
// Statistics and narrative
// ---------------------------------------------------------------------------

/// Numeric report first; the optional summary can only add `ai_summary`.
async fn get_stats(
    State(state): State<ApiState>,
    Query(opts): Query<StatsOptions>,
) -> Result<Json<StatsReport>> {
    let snapshot = forecasts::list_forecasts(&state.pool).await?;
    let report = compute_report(&snapshot);

    info!(
        event = "STATS",
        total = report.total_predictions,
        resolved = report.resolved_predictions,
        bins = report.calibration_bins.len(),
        include_summary = opts.include_summary,
        "stats | total: {} | resolved: {} | brier: {}",
        report.total_predictions,
        report.resolved_predictions,
        report.brier_score.map_or("n/a".to_string(), |b| format!("{b:.4}")),
    );

    let report = if opts.include_summary {
        narrative::enrich(report, state.narrator(), state.summary_timeout, &state.telemetry).await
    } else {
        report
    };
    Ok(Json(report))
}

async fn get_insight(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InsightResponse>> {
    let forecast = forecasts::get_forecast(&state.pool, id).await?;
    let insight =
        narrative::insight(&forecast, state.narrator(), state.summary_timeout, &state.telemetry)
            .await?;
    Ok(Json(InsightResponse { id, insight }))
}

async fn get_suggestions(State(state): State<ApiState>) -> Result<Json<Vec<Suggestion>>> {
    let past: Vec<String> = forecasts::list_forecasts(&state.pool)
        .await?
        .into_iter()
        .map(|f| f.description)
        .collect();
    let list =
        narrative::suggestions(&past, state.narrator(), state.summary_timeout, &state.telemetry)
            .await;
    Ok(Json(list))
}

// ---------------------------------------------------------------------------
// Profile and service status
// ---------------------------------------------------------------------------

async fn get_profile(State(state): State<ApiState>) -> Result<Json<UserProfile>> {
    Ok(Json(profile::get_profile(&state.pool).await?))
}

async fn update_profile(
    State(state): State<ApiState>,
    patch: JsonBody<ProfilePatch>,
) -> Result<Json<UserProfile>> {
    let Json(patch) = patch?;
    Ok(Json(profile::update_profile(&state.pool, patch).await?))
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>> {
    let count = forecasts::count_forecasts(&state.pool).await?;
    Ok(Json(HealthResponse::build(
        state.started_at,
        count,
        state.narrator.is_some(),
        &state.telemetry,
    )))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse::from_telemetry(&state.telemetry))
}
