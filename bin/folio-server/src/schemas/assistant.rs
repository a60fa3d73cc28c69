//! Request / response types for the assistant endpoint.
//!
//! The request is parsed by hand in the handler so that `messages` can stand
//! in for `history` and type errors map to 400; [`AssistantRequest`] only
//! documents the accepted shape.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One entry of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// `"user"` or `"assistant"`. System entries are discarded.
    pub role: String,
    pub content: String,
}

/// Request body for `POST /api/assistant`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistantRequest {
    /// Prior turns, oldest first. `messages` is accepted as an alias.
    pub history: Vec<HistoryEntry>,
    /// `"en"` or `"de"`; anything else means English.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    /// Relay the upstream event stream instead of a buffered reply.
    #[serde(default)]
    pub stream: bool,
}

/// Buffered success body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistantReply {
    pub reply: String,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
