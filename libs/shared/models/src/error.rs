use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const SLOT_UNAVAILABLE_MESSAGE: &str =
    "That time is no longer available, please pick another time";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Stale state: {0}")]
    StaleState(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SlotUnavailable(_)
            | AppError::InvalidTransition(_)
            | AppError::StaleState(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind, sent alongside the human message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
            AppError::Database(_) => "database",
            AppError::ValidationError(_) => "validation",
            AppError::Configuration(_) => "configuration",
            AppError::SlotUnavailable(_) => "slot_unavailable",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::StaleState(_) => "stale_state",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        let message = match &self {
            // Race details stay in the log; clients only see the fixed message.
            AppError::SlotUnavailable(detail) => {
                tracing::info!("Slot unavailable: {}", detail);
                SLOT_UNAVAILABLE_MESSAGE.to_string()
            }
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::Configuration(msg)
            | AppError::InvalidTransition(msg)
            | AppError::StaleState(msg) => {
                tracing::warn!("Error: {}: {}", status, msg);
                msg.clone()
            }
            AppError::Internal(msg) | AppError::Database(msg) => {
                tracing::error!("Error: {}: {}", status, msg);
                msg.clone()
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::ValidationError("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Configuration("x".into()).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::SlotUnavailable("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::StaleState("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Database("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_slot_unavailable_hides_race_details() {
        let response = AppError::SlotUnavailable("lost race on 10:00".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "slot_unavailable");
        assert_eq!(body["error"], SLOT_UNAVAILABLE_MESSAGE);
    }
}
