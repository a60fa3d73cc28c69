//! Client for an OpenAI-compatible chat-completion endpoint.
//!
//! One request per call. Buffered mode parses the JSON body and returns the
//! first choice's content; streamed mode hands back the raw body bytes
//! untouched so they can be relayed as they arrive.

use std::pin::Pin;

use bytes::Bytes;
use folio_types::Message;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Upper bound on the upstream error body carried in [`CompletionError::Status`].
pub const ERROR_EXCERPT_CHARS: usize = 800;

/// Raw upstream body chunks in arrival order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, CompletionError>> + Send>>;

#[derive(Debug, Error)]
pub enum CompletionError {
    /// No API key configured. Raised before any network activity.
    #[error("missing completion API key")]
    MissingCredential,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced an HTTP response.
    #[error("failed to reach completion endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Chat request failed: {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        /// Upstream error body, truncated to [`ERROR_EXCERPT_CHARS`].
        details: String,
    },

    /// A success response whose body is not the expected JSON document.
    #[error("completion response is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A success response without usable assistant content.
    #[error("Chat response missing assistant reply content")]
    MissingContent,

    /// The streamed body failed after the response had started.
    #[error("completion stream interrupted: {0}")]
    Interrupted(#[source] reqwest::Error),
}

/// How the caller wants the reply delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyMode {
    #[default]
    Buffered,
    Streamed,
}

impl ReplyMode {
    pub fn from_flag(stream: bool) -> Self {
        if stream { ReplyMode::Streamed } else { ReplyMode::Buffered }
    }
}

/// The outcome of [`CompletionClient::send`].
pub enum Completion {
    Reply(String),
    Stream(ByteStream),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Reply(reply) => f.debug_tuple("Reply").field(reply).finish(),
            Completion::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Endpoint, model and credential. Process configuration, never caller input.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl CompletionConfig {
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f64,
}

impl CompletionClient {
    /// Fails with [`CompletionError::MissingCredential`] when no key is set.
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let http = http_client().map_err(CompletionError::Client)?;
        Self::with_http(config, http)
    }

    pub fn with_http(config: CompletionConfig, http: reqwest::Client) -> Result<Self, CompletionError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(CompletionError::MissingCredential)?
            .to_owned();

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            model: config.model,
            api_key,
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Issue one completion request in the given mode.
    pub async fn send(&self, messages: &[Message], mode: ReplyMode) -> Result<Completion, CompletionError> {
        match mode {
            ReplyMode::Buffered => self.complete(messages).await.map(Completion::Reply),
            ReplyMode::Streamed => self.stream(messages).await.map(Completion::Stream),
        }
    }

    /// Buffered mode: the trimmed content of the first choice.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let response = self.post(messages, false).await?;
        let body = response.text().await.map_err(CompletionError::Transport)?;
        let reply = extract_reply(&body)?;
        info!(model = %self.model, reply_len = reply.len(), "chat completion done");
        Ok(reply)
    }

    /// Streamed mode: the response body as it arrives. The body is never parsed.
    pub async fn stream(&self, messages: &[Message]) -> Result<ByteStream, CompletionError> {
        let response = self.post(messages, true).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(CompletionError::Interrupted));
        Ok(Box::pin(bytes))
    }

    async fn post(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages,
            stream,
        };
        debug!(endpoint = %self.endpoint, model = %self.model, messages = messages.len(), stream, "chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "completion request failed to send");
                CompletionError::Transport(e)
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let details = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response from completion endpoint".to_owned());
        let details = excerpt(&details, ERROR_EXCERPT_CHARS);
        error!(status = status.as_u16(), %details, "completion endpoint returned an error");
        Err(CompletionError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            details,
        })
    }
}

/// Pull the first choice's trimmed content out of a success body.
pub fn extract_reply(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(CompletionError::Malformed)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or(CompletionError::MissingContent)
}

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

/// The shared outbound client configuration.
pub(crate) fn http_client() -> reqwest::Result<reqwest::Client> {
    build_http(USER_AGENT)
}

fn build_http(user_agent: &str) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(user_agent).build()
}

/// The first `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
