//! API error types and JSON error response formatting.
//!
//! Every failure of the JSON endpoints is answered with an `{"error": ...}`
//! body so callers never have to parse plain-text bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use cinescore_core::error::CinescoreError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code (e.g., "bad_request", "model_unavailable").
    pub code: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 409 Conflict - the pulled artifact set is torn or does not load.
    InconsistentArtifacts(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 502 Bad Gateway - the artifact store could not be reached.
    Upstream(String),
    /// 503 Service Unavailable - no model is loaded.
    ModelUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::InconsistentArtifacts(msg) => {
                (StatusCode::CONFLICT, "inconsistent_artifacts", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
            ApiError::ModelUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", msg)
            }
        };

        let body = ErrorBody {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CinescoreError> for ApiError {
    fn from(err: CinescoreError) -> Self {
        match &err {
            CinescoreError::PreconditionMissing { .. } => {
                ApiError::ModelUnavailable(format!("Model not loaded: {}", err))
            }
            CinescoreError::InconsistentArtifacts(_)
            | CinescoreError::Model(_)
            | CinescoreError::Encoder(_) => ApiError::InconsistentArtifacts(err.to_string()),
            CinescoreError::Transfer(_) => ApiError::Upstream(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_maps_to_503() {
        let err: ApiError = CinescoreError::missing("app/model/best_model.json").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_transfer_maps_to_502() {
        let err: ApiError = CinescoreError::Transfer("timeout".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
