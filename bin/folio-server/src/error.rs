//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body of the form
//! `{"error": "...", "details": "..."}` with an appropriate status code.
//!
//! Content and filesystem errors are logged in full but only a fixed message
//! reaches the caller, so paths never leak. Upstream error bodies are passed
//! through as `details` because they carry nothing of ours.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_core::{CompletionError, PromptError};
use thiserror::Error;
use tracing::{error, warn};

use crate::schemas::assistant::ErrorBody;

/// All errors that can occur in the folio-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No upstream credential is configured.
    #[error("Missing OPENAI_API_KEY")]
    MissingCredential,

    /// The route exists but not for this method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the buffering limit.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// The system prompt could not be built.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The upstream call failed before a reply was produced.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// The upstream stream failed before its first chunk.
    #[error("stream error: {0}")]
    Stream(String),
}

impl ServerError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        match self {
            ServerError::MissingCredential => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(self.to_string()))
            }
            ServerError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, ErrorBody::new(self.to_string()))
            }
            ServerError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::new(self.to_string()))
            }
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, ErrorBody::new(m.clone())),
            ServerError::Prompt(e) => {
                error!(error = ?e, "failed to build system prompt");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(e.to_string()))
            }
            ServerError::Completion(e) => completion_parts(e),
            ServerError::Stream(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Stream error").with_details(details.clone()),
            ),
        }
    }
}

fn completion_parts(e: &CompletionError) -> (StatusCode, ErrorBody) {
    match e {
        CompletionError::MissingCredential => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new(ServerError::MissingCredential.to_string()),
        ),
        CompletionError::Client(source) => {
            error!(error = %source, "failed to build HTTP client");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new("Internal server error"))
        }
        CompletionError::Transport(source) => {
            error!(error = %source, "completion endpoint unreachable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Failed to reach completion endpoint").with_details(source.to_string()),
            )
        }
        CompletionError::Status { status, details, .. } => {
            warn!(status, "completion endpoint returned an error");
            let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            (code, ErrorBody::new(e.to_string()).with_details(details.clone()))
        }
        CompletionError::Malformed(source) => {
            error!(error = %source, "completion response was not valid JSON");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Invalid response from completion endpoint").with_details(source.to_string()),
            )
        }
        CompletionError::MissingContent => {
            warn!("completion response had no assistant content");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(e.to_string()))
        }
        CompletionError::Interrupted(source) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Stream error").with_details(source.to_string()),
        ),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn upstream_status_is_mirrored() {
        let err = ServerError::from(CompletionError::Status {
            status: 429,
            reason: "Too Many Requests".into(),
            details: "slow down".into(),
        });
        let (status, body) = err.parts();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error, "Chat request failed: 429 Too Many Requests");
        assert_eq!(body.details.as_deref(), Some("slow down"));
    }

    #[test]
    fn missing_credential_has_fixed_message() {
        let (status, body) = ServerError::MissingCredential.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Missing OPENAI_API_KEY");
        assert!(body.details.is_none());
    }

    #[test]
    fn stream_errors_carry_details() {
        let (_, body) = ServerError::Stream("connection reset".into()).parts();
        assert_eq!(body.error, "Stream error");
        assert_eq!(body.details.as_deref(), Some("connection reset"));
    }
}
