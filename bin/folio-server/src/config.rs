//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use folio_core::completion::{CompletionConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Runtime configuration for folio-server.
///
/// Every field except the API key has a default, so the server starts
/// without any environment set. Without a key the assistant endpoint
/// answers 500 until one is configured.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Directory holding `content-<lang>/` folders (default: `"content"`).
    pub content_dir: PathBuf,

    /// Keep successful content reads for the lifetime of the process.
    pub cache_content: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins. `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,

    /// Upstream chat-completion endpoint, model and credential.
    pub completion: CompletionConfig,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("FOLIO_BIND", "0.0.0.0:3000"),
            content_dir: PathBuf::from(env_or("FOLIO_CONTENT_DIR", "content")),
            cache_content: flag_env("FOLIO_CACHE_CONTENT", false),
            log_level: env_or("FOLIO_LOG", "info"),
            log_json: flag_env("FOLIO_LOG_JSON", false),
            cors_allowed_origins: non_empty_env("FOLIO_CORS_ORIGINS"),
            enable_docs: flag_env("FOLIO_ENABLE_DOCS", true),
            completion: CompletionConfig {
                base_url: env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
                model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
                api_key: non_empty_env("OPENAI_API_KEY"),
                temperature: DEFAULT_TEMPERATURE,
            },
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| default.to_owned())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn flag_env(key: &str, default: bool) -> bool {
    non_empty_env(key).map(|v| parse_flag(&v)).unwrap_or(default)
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}
