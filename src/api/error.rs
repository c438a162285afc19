//! API error responses
//!
//! Every failure leaves the API as `{ "error": { "code", "message" } }` with
//! a status derived from the code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::ValidationError;
use crate::services::{RecordServiceError, SerializeError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the underlying failure and return a generic 500
    pub fn internal(err: &anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        Self::internal_error("An internal error occurred")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<RecordServiceError> for ApiError {
    fn from(err: RecordServiceError) -> Self {
        match err {
            RecordServiceError::NotFound(msg) => ApiError::not_found(msg),
            RecordServiceError::Validation(msg) => ApiError::validation_error(msg),
            RecordServiceError::Conflict(msg) => ApiError::conflict(msg),
            RecordServiceError::Internal(e) => ApiError::internal(&e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation_error(err.to_string())
            .with_details(serde_json::json!({ "field": err.field }))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(rejection.body_text())
    }
}

// A stored id too large for a JSON number on a numeric-id endpoint
impl From<SerializeError> for ApiError {
    fn from(err: SerializeError) -> Self {
        tracing::error!("Serialization failed: {}", err);
        ApiError::internal_error(err.to_string())
    }
}
