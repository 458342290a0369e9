use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::Environment;

/// One failed validation rule, addressed to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// JSON envelope shared by every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                details: None,
                errors: None,
            },
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body.details = Some(details.into());
        self
    }

    pub fn invalid_data(errors: Vec<FieldError>) -> Self {
        let mut err = Self::new(StatusCode::BAD_REQUEST, "Invalid data");
        err.body.errors = Some(errors);
        err
    }

    /// 500 with the raw cause attached only where the environment allows it.
    pub fn internal(message: &str, cause: &dyn std::fmt::Display, env: Environment) -> Self {
        let err = Self::new(StatusCode::INTERNAL_SERVER_ERROR, message);
        if env.exposes_error_details() {
            err.with_details(cause.to_string())
        } else {
            err
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Catch-all for unknown paths and for methods a path does not serve.
pub async fn route_not_found() -> Response {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found")
        .with_details("The requested route does not exist")
        .into_response()
}
