use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStatus {
    /// An upstream client is configured.
    Ready,
    /// `OPENAI_API_KEY` is not set; the assistant endpoint answers 500.
    MissingCredential,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub assistant: AssistantStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
}
