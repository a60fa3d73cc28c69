//! Shared types for the folio workspace.
//!
//! Everything here is plain data: the wire shape of chat-completion messages,
//! the UI-facing conversation record, and the structured portfolio content
//! loaded from disk.

mod content;
mod language;
mod message;

pub use content::{Persona, Project};
pub use language::Language;
pub use message::{ChatMessage, ChatRole, Link, Message, Role};
