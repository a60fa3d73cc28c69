//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use folio_core::{CachedContent, CompletionClient, ContentSource, FsContent, PromptComposer};
use tracing::{info, warn};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Builds the system prompt from the content directory.
    pub composer: PromptComposer,
    /// Upstream client. `None` when no API key is configured.
    pub completion: Option<Arc<CompletionClient>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let fs = FsContent::new(&config.content_dir);
        let source: Arc<dyn ContentSource> = if config.cache_content {
            info!(root = %fs.root().display(), "content cache enabled");
            Arc::new(CachedContent::new(fs))
        } else {
            Arc::new(fs)
        };

        let completion = match CompletionClient::new(config.completion.clone()) {
            Ok(client) => {
                info!(endpoint = client.endpoint(), model = client.model(), "completion client ready");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!(error = %e, "assistant endpoint disabled until OPENAI_API_KEY is set");
                None
            }
        };

        Self { config: Arc::new(config), composer: PromptComposer::new(source), completion }
    }
}
