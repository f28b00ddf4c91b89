//! Error taxonomy shared by the model clients, the extractor and the HTTP layer.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a text-generation provider (or the transport to it).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("quota or rate limit exceeded: {0}")]
    Quota(String),

    #[error("provider server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("content blocked by provider: {0}")]
    ContentFiltered(String),

    #[error("malformed provider response: {0}")]
    MalformedEnvelope(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status returned by a provider.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Auth {
                status,
                message: body,
            },
            // Gemini answers 400 INVALID_ARGUMENT for a bad key
            400 if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
                ProviderError::Auth {
                    status,
                    message: body,
                }
            }
            429 => ProviderError::Quota(body),
            500..=599 => ProviderError::Server {
                status,
                message: body,
            },
            _ => ProviderError::Rejected {
                status,
                message: body,
            },
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport(_)
                | ProviderError::Timeout(_)
                | ProviderError::Server { .. }
                | ProviderError::Quota(_)
        )
    }
}

/// Failure to pull structured items out of a model reply.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("malformed JSON in model output: {0}")]
    Malformed(String),

    #[error("model output does not match the expected shape: {0}")]
    Schema(String),
}

/// Stable, serializable failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnavailable,
    ProviderRejected,
    ExtractionFailed,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::ExtractionFailed => "extraction_failed",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

/// Result of any pipeline operation that did not produce usable content.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),

    #[error("model provider rejected the request: {0}")]
    ProviderRejected(#[source] ProviderError),

    /// `raw` keeps the model reply for logging; it is never shown as content.
    #[error("could not extract structured output: {reason}")]
    ExtractionFailed { reason: String, raw: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            GenerationError::ProviderRejected(_) => ErrorKind::ProviderRejected,
            GenerationError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            GenerationError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        GenerationError::InvalidInput(message.into())
    }

    pub fn extraction<S: Into<String>>(reason: S, raw: &str) -> Self {
        GenerationError::ExtractionFailed {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { .. } | ProviderError::ContentFiltered(_) => {
                GenerationError::ProviderRejected(err)
            }
            _ => GenerationError::ProviderUnavailable(err),
        }
    }
}
