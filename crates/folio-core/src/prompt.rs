//! System prompt composition.
//!
//! The system message is derived from content at call time and is never part
//! of the stored conversation. Every request recomposes it, so edits to the
//! content directory show up on the next turn.

use std::future::Future;
use std::sync::Arc;

use folio_types::{Language, Message, Project, Role};
use thiserror::Error;
use tracing::{debug, warn};

use crate::content::{ContentError, ContentFile, ContentSource};

/// Placeholder used when no project content could be loaded.
pub const NO_PROJECTS: &str = "No projects provided.";

const POLICY: &str = "\
You are a personal chatbot that answers questions using the person's profile JSON and projects.
If the question is about the person (even implicitly, e.g. \"Are they a great developer?\"), answer using the profile, projects, and reasonable inference. If the question is clearly unrelated to the person (e.g. \"How do nuclear reactors work?\"), politely decline and steer back to their experience, skills, or projects (e.g. \"I can only reply to questions about this person. Ask about their experience or projects.\").
When a skill or tool is not listed, say so clearly but end on a constructive note by linking nearby strengths and proven learning ability (transferable languages, frameworks, fast ramp-ups), without inventing experience.
Avoid guessing seniority labels (beginner/intermediate/advanced) unless the profile states them explicitly. Describe capability with evidence instead: years, shipped features, responsibilities, or adjacent tools.
Treat roles with an end date before today as past roles; do not describe them as current. If no current role is listed, state that they are currently not employed and highlight availability for new roles. When asked what they are currently working on, prioritize current projects and recent focus areas; if no current role exists, summarize recent projects, skills and availability instead of implying current employment.
Use ATS-friendly language and the STAR lens (Situation, Task, Action, Result) to structure responses, but do not make everything a bullet list. Prefer short paragraphs for context and insert bullet points (lines starting with \"- \") only when they improve clarity for actions, results, or takeaways. Bold (**text**) or underline (__text__) key phrases sparingly for emphasis.
When you mention a project, cite its links as markdown links [label](url) using the exact URLs from the project data. Never invent, shorten, or rewrite URLs, and do not link to anything that is not in the profile or projects.";

#[derive(Debug, Error)]
pub enum PromptError {
    /// The required profile could not be loaded in any language.
    #[error("Unable to load profile.json")]
    ProfileUnavailable {
        #[source]
        source: ContentError,
    },
}

/// Run `load` for the requested language, then once more for the default
/// language if the first attempt failed. Only the final failure is returned.
pub async fn with_fallback<T, F, Fut>(language: Language, mut load: F) -> Result<T, ContentError>
where
    F: FnMut(Language) -> Fut,
    Fut: Future<Output = Result<T, ContentError>>,
{
    match load(language).await {
        Err(e) if !language.is_default() => {
            let fallback = Language::default();
            warn!(%language, %fallback, error = %e, "content load failed, falling back");
            load(fallback).await
        }
        other => other,
    }
}

/// Render the system prompt from already-loaded content.
pub fn system_prompt(language: Language, profile: &str, projects: &str) -> String {
    let projects = match projects.trim() {
        "" => NO_PROJECTS,
        text => text,
    };
    format!(
        "{POLICY}\n\nProfile JSON:\n{profile}\n\nProjects:\n{projects}\n\nAnswer in {}.",
        language.name()
    )
}

/// Builds the system message for a request from the content store.
#[derive(Clone)]
pub struct PromptComposer {
    source: Arc<dyn ContentSource>,
}

impl PromptComposer {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Pretty-printed profile JSON. Fatal when no language has a usable profile.
    pub async fn load_profile(&self, language: Language) -> Result<String, PromptError> {
        with_fallback(language, |lang| self.read_json(lang, ContentFile::Profile))
            .await
            .and_then(|value| pretty(language, ContentFile::Profile, &value))
            .map_err(|source| PromptError::ProfileUnavailable { source })
    }

    /// Project text for the prompt: prose when available, otherwise the
    /// structured list. Degrades to an empty string.
    pub async fn load_project_context(&self, language: Language) -> String {
        let loaded = with_fallback(language, |lang| async move {
            match self.source.read(lang, ContentFile::ProjectsMarkdown).await {
                Ok(text) if !text.trim().is_empty() => Ok(text),
                _ => {
                    let value = self.read_json(lang, ContentFile::ProjectsJson).await?;
                    pretty(lang, ContentFile::ProjectsJson, &value)
                }
            }
        })
        .await;

        loaded.unwrap_or_else(|e| {
            warn!(error = %e, "unable to load projects; continuing without projects context");
            String::new()
        })
    }

    /// Structured projects used for link labelling. Degrades to an empty list.
    pub async fn load_projects(&self, language: Language) -> Vec<Project> {
        let loaded = with_fallback(language, |lang| async move {
            let raw = self.source.read(lang, ContentFile::ProjectsJson).await?;
            Project::parse_list(&raw).map_err(|source| ContentError::Json {
                file: ContentFile::ProjectsJson.file_name(),
                language: lang,
                source,
            })
        })
        .await;

        loaded.unwrap_or_else(|e| {
            warn!(error = %e, "unable to load project links");
            Vec::new()
        })
    }

    /// The full system prompt for `language`.
    pub async fn compose(&self, language: Language) -> Result<String, PromptError> {
        let profile = self.load_profile(language).await?;
        let projects = self.load_project_context(language).await;
        Ok(system_prompt(language, &profile, &projects))
    }

    /// `[system, ...history]`, with any caller-supplied system entries removed
    /// so exactly one system message reaches the model.
    pub async fn compose_messages(
        &self,
        language: Language,
        history: &[Message],
    ) -> Result<Vec<Message>, PromptError> {
        let system = self.compose(language).await?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(system));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());

        let dropped = history.len() + 1 - messages.len();
        if dropped > 0 {
            debug!(dropped, "discarded system messages from caller history");
        }
        Ok(messages)
    }

    async fn read_json(
        &self,
        language: Language,
        file: ContentFile,
    ) -> Result<serde_json::Value, ContentError> {
        let raw = self.source.read(language, file).await?;
        serde_json::from_str(&raw).map_err(|source| ContentError::Json {
            file: file.file_name(),
            language,
            source,
        })
    }
}

fn pretty(
    language: Language,
    file: ContentFile,
    value: &serde_json::Value,
) -> Result<String, ContentError> {
    serde_json::to_string_pretty(value).map_err(|source| ContentError::Json {
        file: file.file_name(),
        language,
        source,
    })
}
