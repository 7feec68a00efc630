use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::ApiMetrics;

/// Client message for renderer failures
pub const RENDER_FAILED_MESSAGE: &str = "Unable to render template";
/// Client message for exporter failures
pub const EXPORT_FAILED_MESSAGE: &str = "Unable to export PDF";
/// Client message for unclassified server failures
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Template rendering failed; the detail is logged, never returned
    #[error("Render error: {0}")]
    Render(String),

    /// PDF export failed; the detail is logged, never returned
    #[error("Export error: {0}")]
    Export(String),

    #[error("Internal error: {detail}")]
    Internal { public: String, detail: String },
}

impl AppError {
    /// Internal failure with a generic client-facing message and a logged detail
    pub fn internal(public: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::Internal {
            public: public.into(),
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Render(_) | AppError::Export(_) | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code, used for logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Render(_) => "RENDER_ERROR",
            AppError::Export(_) => "EXPORT_ERROR",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to API clients
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Render(_) => RENDER_FAILED_MESSAGE.to_string(),
            AppError::Export(_) => EXPORT_FAILED_MESSAGE.to_string(),
            AppError::Internal { public, .. } if public.is_empty() => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            AppError::Internal { public, .. } => public.clone(),
        }
    }

    fn log_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Render(msg)
            | AppError::Export(msg) => msg.clone(),
            AppError::Internal { detail, .. } => detail.clone(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let log_message = self.log_message();

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }
        ApiMetrics::record_error(code);

        let body = ErrorResponse {
            message: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
