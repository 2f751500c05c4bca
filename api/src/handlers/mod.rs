pub mod health;
pub mod jobs;
pub mod login;
pub mod metrics;
pub mod portal;

// Common response types
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use common::errors::ApiError;
use serde::Serialize;
use tera::Context;

use crate::templates::TEMPLATES;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub trace_id: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            error: err.code,
            message: err.message,
            details: err.details,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "SCHEDULER_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// One-shot status message shown above the portal form
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Flash {
    pub kind: &'static str,
    pub message: String,
    /// Pretty-printed JSON shown under the message
    pub detail: Option<String>,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, value: &serde_json::Value) -> Self {
        self.detail = serde_json::to_string_pretty(value).ok();
        self
    }
}

/// Render a template, turning template failures into a 500
pub fn render(template: &str, context: &Context) -> Result<Html<String>, ErrorResponse> {
    TEMPLATES.render(template, context).map(Html).map_err(|e| {
        tracing::error!(template = template, error = ?e, "Template rendering failed");
        ErrorResponse::new("TEMPLATE_ERROR", format!("Failed to render {}", template))
    })
}
