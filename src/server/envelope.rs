//! Uniform JSON error envelope: `{"error": {"kind", "message"}}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ErrorKind, GenerationError, ProviderError};
use crate::util::preview;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: ErrorKind,
    message: String,
}

/// A pipeline failure on its way to an HTTP client
#[derive(Debug)]
pub struct ApiError(pub GenerationError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GenerationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GenerationError::ProviderUnavailable(ProviderError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            GenerationError::ProviderUnavailable(_)
            | GenerationError::ProviderRejected(_)
            | GenerationError::ExtractionFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(GenerationError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            GenerationError::ExtractionFailed { reason, raw } => {
                warn!("Extraction failed ({}); raw reply: {}", reason, preview(raw, 500));
            }
            GenerationError::InvalidInput(message) => debug!("Rejected request: {}", message),
            other => warn!("Request failed: {}", other),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.0.kind(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
