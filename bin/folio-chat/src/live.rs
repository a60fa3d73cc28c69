//! A reply source that prints deltas as they arrive.

use std::io::Write;

use async_trait::async_trait;
use folio_core::{AssistantApi, AssistantError, ReplySource};
use folio_types::{Language, Message};
use futures::StreamExt;

/// Streams from the assistant endpoint, echoing each delta to `out`, and
/// hands the full text back to the session once the stream ends.
pub struct LiveReply<W> {
    api: AssistantApi,
    out: std::sync::Mutex<W>,
}

impl<W: Write + Send> LiveReply<W> {
    pub fn new(api: AssistantApi, out: W) -> Self {
        Self { api, out: std::sync::Mutex::new(out) }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn echo(&self, delta: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(delta.as_bytes());
            let _ = out.flush();
        }
    }
}

#[async_trait]
impl<W: Write + Send> ReplySource for LiveReply<W> {
    async fn reply(&self, history: &[Message], language: Language) -> Result<String, AssistantError> {
        let mut deltas = self.api.reply_stream(history, language).await?;
        let mut reply = String::new();
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            self.echo(&delta);
            reply.push_str(&delta);
        }
        self.echo("\n");

        if reply.trim().is_empty() {
            return Err(AssistantError::MissingReply);
        }
        Ok(reply)
    }
}
