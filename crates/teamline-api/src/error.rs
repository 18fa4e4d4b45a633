use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use teamline_types::api::ErrorResponse;

/// Error taxonomy for the REST surface. Only three status codes exist:
/// 404 for absent referents, 400 for missing/invalid fields, 500 otherwise.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match &self {
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone(), None),
            Self::Validation(m) => (StatusCode::BAD_REQUEST, m.clone(), None),
            Self::Internal(e) => {
                error!("unhandled error: {:#}", e);
                // Error detail leaks internals; only expose it outside production.
                let detail = if is_production() {
                    None
                } else {
                    Some(format!("{e:#}"))
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong".to_string(), detail)
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}

fn is_production() -> bool {
    std::env::var("TEAMLINE_ENV").is_ok_and(|v| v == "production")
}
