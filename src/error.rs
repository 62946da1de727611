use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Aries AI is currently unavailable")]
    EngineDisabled,

    #[error("Unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::EngineDisabled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::EngineDisabled => json!({
                "error": self.to_string(),
                "suggestion": "Please try again later",
            }),
            ApiError::Unexpected(e) => {
                log::error!("request failed: {:#}", e);
                json!({ "error": self.to_string() })
            }
            ApiError::Validation(_) => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[test]
fn test_status_mapping() {
    assert_eq!(
        ApiError::Validation("q is required".into()).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ApiError::EngineDisabled.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        ApiError::from(anyhow::anyhow!("boom")).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
