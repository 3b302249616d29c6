use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Request body that is not valid JSON or fails a field check (e.g. probability out of range).
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Forecast {0} not found")]
    NotFound(Uuid),

    #[error("Forecast {0} is already resolved")]
    AlreadyResolved(Uuid),

    /// A stored row that breaks the forecast invariants.
    #[error("Invalid forecast record: {0}")]
    InvalidRecord(String),

    #[error("Narrative generator error: {0}")]
    Narrative(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyResolved(_) => StatusCode::CONFLICT,
            AppError::Narrative(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        let id = Uuid::nil();
        assert_eq!(AppError::Validation("bad".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound(id).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AlreadyResolved(id).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn narrative_and_storage_errors_are_server_side() {
        assert_eq!(
            AppError::Narrative("no key".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::InvalidRecord("resolved without outcome".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
