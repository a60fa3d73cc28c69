//! On-disk portfolio content.
//!
//! Content lives in one directory per language:
//!
//! ```text
//! <root>/content-en/profile.json
//! <root>/content-en/projects.json
//! <root>/content-en/projects.md
//! <root>/content-de/...
//! ```
//!
//! Files are read on demand. [`CachedContent`] can wrap any source to keep
//! successful reads for the lifetime of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use folio_types::Language;
use thiserror::Error;
use tracing::debug;

/// The content files known to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFile {
    /// Structured profile record (required).
    Profile,
    /// Structured project list with link maps.
    ProjectsJson,
    /// Prose description of projects.
    ProjectsMarkdown,
}

impl ContentFile {
    pub fn file_name(self) -> &'static str {
        match self {
            ContentFile::Profile => "profile.json",
            ContentFile::ProjectsJson => "projects.json",
            ContentFile::ProjectsMarkdown => "projects.md",
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} for '{language}' is not valid JSON: {source}")]
    Json {
        file: &'static str,
        language: Language,
        #[source]
        source: serde_json::Error,
    },
}

/// Read access to per-language content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn read(&self, language: Language, file: ContentFile) -> Result<String, ContentError>;
}

/// Content read straight from a directory tree.
#[derive(Debug, Clone)]
pub struct FsContent {
    root: PathBuf,
}

impl FsContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, language: Language, file: ContentFile) -> PathBuf {
        self.root
            .join(format!("content-{}", language.code()))
            .join(file.file_name())
    }
}

#[async_trait]
impl ContentSource for FsContent {
    async fn read(&self, language: Language, file: ContentFile) -> Result<String, ContentError> {
        let path = self.path(language, file);
        debug!(path = %path.display(), "reading content file");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ContentError::Io { path, source })
    }
}

/// Memoises successful reads of another source. Failures are not cached.
#[derive(Debug)]
pub struct CachedContent<S> {
    inner: S,
    cache: RwLock<HashMap<(Language, ContentFile), String>>,
}

impl<S> CachedContent<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, cache: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl<S: ContentSource> ContentSource for CachedContent<S> {
    async fn read(&self, language: Language, file: ContentFile) -> Result<String, ContentError> {
        let hit = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&(language, file)).cloned());
        if let Some(hit) = hit {
            return Ok(hit);
        }

        let text = self.inner.read(language, file).await?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert((language, file), text.clone());
        }
        Ok(text)
    }
}
