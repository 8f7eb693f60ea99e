use axum::{
    response::{IntoResponse, Response},
    Json,
};
use disruption::DisruptionError;
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
}

impl From<DisruptionError> for ApiError {
    fn from(e: DisruptionError) -> Self {
        match e {
            DisruptionError::UnknownEvent(_) => ApiError::NotFound(e.to_string()),
            DisruptionError::NotActive(..) | DisruptionError::Duplicate(_) => {
                ApiError::Conflict(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
