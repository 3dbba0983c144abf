//! HTTP-facing error type

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Store failure; the client only sees `message`
    #[error("{message}: {source}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    /// Restart upstream failed or rejected the call
    #[error("restart failed ({status}): {details}")]
    Restart { status: StatusCode, details: String },

    #[error("restart is not configured")]
    RestartUnavailable,
}

impl ApiError {
    pub fn query_failed(source: StoreError) -> Self {
        ApiError::Store {
            message: "Database query failed",
            source,
        }
    }

    pub fn suggestions_failed(source: StoreError) -> Self {
        ApiError::Store {
            message: "Failed to fetch article numbers",
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Restart { status, .. } => *status,
            ApiError::RestartUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);

        let status = self.status();
        let body = match self {
            ApiError::Store { message, .. } => json!({ "error": message }),
            ApiError::Restart { details, .. } => json!({
                "error": "Failed to restart service",
                "details": details,
            }),
            ApiError::RestartUnavailable => json!({ "error": "Restart is not configured" }),
        };

        (status, Json(body)).into_response()
    }
}
