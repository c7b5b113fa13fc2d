//! HTTP-facing error type for the `/api` routes.
//!
//! Every variant renders as `{ "error": "<message>" }` so page code can show
//! `error` without caring which layer failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::services::backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    /// The backend answered with a non-success status.
    #[error("{detail}")]
    Backend { status: StatusCode, detail: String },

    /// The backend could not be reached or returned garbage.
    #[error("Internal server error")]
    BackendUnavailable(#[source] BackendError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Backend { status, .. } => *status,
            Self::BackendUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, detail } => Self::Backend {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                detail,
            },
            other => Self::BackendUnavailable(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::BackendUnavailable(source) = &self {
            tracing::error!(error = %source, "backend request failed");
        }
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
