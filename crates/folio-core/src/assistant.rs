//! Where assistant replies come from.
//!
//! Two deployments exist: the browser talks to the assistant endpoint
//! ([`AssistantApi`]), or the pipeline runs in-process and calls the
//! completion endpoint itself ([`DirectAssistant`]).

use async_trait::async_trait;
use folio_types::{Language, Message};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::completion::{CompletionClient, CompletionError, http_client};
use crate::prompt::{PromptComposer, PromptError};
use crate::sse::DeltaDecoder;

/// Text deltas of a streamed reply.
pub type TextStream = BoxStream<'static, Result<String, AssistantError>>;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("failed to reach assistant endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    /// The assistant endpoint answered with an error document.
    #[error("{error}")]
    Endpoint {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("assistant response missing reply")]
    MissingReply,
}

#[async_trait]
pub trait ReplySource: Send + Sync {
    async fn reply(&self, history: &[Message], language: Language) -> Result<String, AssistantError>;
}

#[derive(Serialize)]
struct AssistantRequest<'a> {
    history: &'a [Message],
    language: Language,
    stream: bool,
}

#[derive(Deserialize, Default)]
struct AssistantResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Client of the `POST /api/assistant` endpoint.
#[derive(Debug, Clone)]
pub struct AssistantApi {
    http: reqwest::Client,
    endpoint: String,
}

impl AssistantApi {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = http_client().unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client, using reqwest defaults");
            reqwest::Client::new()
        });
        Self { http, endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Streamed reply, decoded from the relayed event stream.
    pub async fn reply_stream(
        &self,
        history: &[Message],
        language: Language,
    ) -> Result<TextStream, AssistantError> {
        let response = self.post(history, language, true).await?;
        let bytes = Box::pin(response.bytes_stream());

        // The decoder is flushed once the body ends so an unterminated last
        // event still yields its delta.
        let deltas = stream::unfold(Some((bytes, DeltaDecoder::new())), |state| async move {
            let (mut bytes, mut decoder) = state?;
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    let batch: Vec<Result<String, AssistantError>> = decoder.push(&chunk).into_iter().map(Ok).collect();
                    Some((batch, Some((bytes, decoder))))
                }
                Some(Err(e)) => Some((vec![Err(AssistantError::Transport(e))], None)),
                None => Some((decoder.finish().into_iter().map(Ok).collect::<Vec<_>>(), None)),
            }
        })
        .flat_map(stream::iter);
        Ok(deltas.boxed())
    }

    async fn post(
        &self,
        history: &[Message],
        language: Language,
        stream: bool,
    ) -> Result<reqwest::Response, AssistantError> {
        debug!(endpoint = %self.endpoint, turns = history.len(), %language, stream, "assistant request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&AssistantRequest { history, language, stream })
            .send()
            .await
            .map_err(AssistantError::Transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: AssistantResponse = response.json().await.unwrap_or_default();
        let error = body
            .error
            .unwrap_or_else(|| format!("Assistant request failed: {status}"));
        warn!(status = status.as_u16(), %error, "assistant endpoint returned an error");
        Err(AssistantError::Endpoint { status: status.as_u16(), error, details: body.details })
    }
}

#[async_trait]
impl ReplySource for AssistantApi {
    async fn reply(&self, history: &[Message], language: Language) -> Result<String, AssistantError> {
        let response = self.post(history, language, false).await?;
        let body: AssistantResponse = response.json().await.map_err(AssistantError::Transport)?;
        body.reply
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .ok_or(AssistantError::MissingReply)
    }
}

/// The whole pipeline in-process: compose, then call the completion endpoint.
#[derive(Clone)]
pub struct DirectAssistant {
    composer: PromptComposer,
    client: CompletionClient,
}

impl DirectAssistant {
    pub fn new(composer: PromptComposer, client: CompletionClient) -> Self {
        Self { composer, client }
    }
}

#[async_trait]
impl ReplySource for DirectAssistant {
    async fn reply(&self, history: &[Message], language: Language) -> Result<String, AssistantError> {
        let messages = self.composer.compose_messages(language, history).await?;
        Ok(self.client.complete(&messages).await?)
    }
}
