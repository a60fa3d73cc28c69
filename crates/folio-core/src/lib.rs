//! The folio assistant pipeline.
//!
//! Content is loaded per language ([`content`]), turned into a system prompt
//! ([`prompt`]), and sent together with the visitor's history to an
//! OpenAI-compatible endpoint ([`completion`]). Replies are rendered into
//! blocks and labelled links ([`render`]). [`conversation`] holds the
//! client-side turn state and drives any [`assistant::ReplySource`].

pub mod assistant;
pub mod completion;
pub mod content;
pub mod conversation;
pub mod prompt;
pub mod render;
pub mod speech;
pub mod sse;

pub use assistant::{AssistantApi, AssistantError, DirectAssistant, ReplySource};
pub use completion::{Completion, CompletionClient, CompletionConfig, CompletionError, ReplyMode};
pub use content::{CachedContent, ContentError, ContentFile, ContentSource, FsContent};
pub use conversation::{ChatSession, Conversation, ConversationError, TurnOutcome, TurnState};
pub use prompt::{PromptComposer, PromptError};
pub use render::{LinkLabels, RenderedReply, render_reply};
pub use sse::DeltaDecoder;
