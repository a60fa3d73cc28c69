//! Per-session conversation state.
//!
//! [`Conversation`] is the synchronous state machine: it owns the visible
//! message list and enforces one turn at a time. [`ChatSession`] drives it
//! against a [`ReplySource`] and an optional speech recogniser.

use folio_types::{ChatMessage, Language, Message, Persona};
use thiserror::Error;
use tracing::{debug, warn};

use crate::assistant::ReplySource;
use crate::render::{LinkLabels, extract_links};
use crate::speech::{DisabledSpeech, SpeechHandle, SpeechOptions, SpeechRecognizer};

/// Inputs that switch to voice input instead of starting a turn.
pub const TRIGGER_WORDS: [&str; 2] = ["speak", "sprich"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Listening,
    /// A turn is in flight; `pending` is the id of the placeholder message.
    AwaitingReply { pending: String },
    Resolved,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input; nothing happened.
    Ignored,
    /// The trigger word was entered; no turn was created.
    StartListening,
    /// A turn started; send `history` to the reply source.
    Turn { history: Vec<Message> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("a reply is still pending")]
    TurnInFlight,

    #[error("no reply is pending")]
    NoPendingTurn,
}

fn pending_text(language: Language) -> &'static str {
    match language {
        Language::En => "Thinking...",
        Language::De => "Denke nach...",
    }
}

fn failure_text(language: Language, reason: &str) -> String {
    match language {
        Language::En => format!("Something went wrong: {reason}"),
        Language::De => format!("Etwas ist schiefgelaufen: {reason}"),
    }
}

/// The greeting shown before the visitor says anything.
pub fn intro_text(language: Language, persona: &Persona) -> String {
    let subtitle = persona
        .subtitle
        .as_deref()
        .map(|s| format!(" — {s}"))
        .unwrap_or_default();
    match language {
        Language::En => format!(
            "Hi! I'm {}'s chatbot. Ask me about my experience as a {}{subtitle}.",
            persona.name, persona.title
        ),
        Language::De => format!(
            "Hallo! Ich bin der Chatbot von {}. Frag mich nach meiner Erfahrung als {}{subtitle}.",
            persona.name, persona.title
        ),
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    language: Language,
    messages: Vec<ChatMessage>,
    state: TurnState,
}

impl Conversation {
    pub fn new(language: Language) -> Self {
        Self { language, messages: Vec::new(), state: TurnState::Idle }
    }

    /// A conversation opened by the persona's greeting.
    pub fn with_persona(language: Language, persona: &Persona) -> Self {
        let mut conversation = Self::new(language);
        conversation
            .messages
            .push(ChatMessage::assistant(intro_text(language, persona)));
        conversation
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TurnState::AwaitingReply { .. })
    }

    pub fn is_trigger_word(text: &str) -> bool {
        let normalized = text.trim();
        TRIGGER_WORDS.iter().any(|w| normalized.eq_ignore_ascii_case(w))
    }

    pub fn submit(&mut self, text: &str) -> Result<Submission, ConversationError> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            self.stop_listening();
            return Ok(Submission::Ignored);
        }

        if Self::is_trigger_word(trimmed) {
            return match self.state {
                TurnState::AwaitingReply { .. } => Err(ConversationError::TurnInFlight),
                TurnState::Listening => Ok(Submission::Ignored),
                _ => {
                    self.state = TurnState::Listening;
                    Ok(Submission::StartListening)
                }
            };
        }

        self.stop_listening();
        if self.is_pending() {
            return Err(ConversationError::TurnInFlight);
        }

        self.messages.push(ChatMessage::user(trimmed));
        let history = self.messages.iter().map(ChatMessage::to_message).collect();

        let placeholder = ChatMessage::assistant(pending_text(self.language));
        self.state = TurnState::AwaitingReply { pending: placeholder.id.clone() };
        self.messages.push(placeholder);

        debug!(turns = self.messages.len(), "turn submitted");
        Ok(Submission::Turn { history })
    }

    /// Leave the listening sub-state. Returns `true` if it was active.
    pub fn stop_listening(&mut self) -> bool {
        if self.state == TurnState::Listening {
            self.state = TurnState::Idle;
            return true;
        }
        false
    }

    /// Replace the pending placeholder with the assistant's reply.
    pub fn resolve(&mut self, reply: &str, labels: &LinkLabels) -> Result<&ChatMessage, ConversationError> {
        let message = ChatMessage::assistant(reply.trim()).with_links(extract_links(reply, labels));
        self.replace_pending(message, TurnState::Resolved)
    }

    /// Replace the pending placeholder with an error message.
    pub fn fail(&mut self, reason: &str) -> Result<&ChatMessage, ConversationError> {
        let message = ChatMessage::assistant(failure_text(self.language, reason));
        self.replace_pending(message, TurnState::Errored)
    }

    fn replace_pending(
        &mut self,
        message: ChatMessage,
        next: TurnState,
    ) -> Result<&ChatMessage, ConversationError> {
        let TurnState::AwaitingReply { pending } = &self.state else {
            return Err(ConversationError::NoPendingTurn);
        };
        let index = self
            .messages
            .iter()
            .position(|m| &m.id == pending)
            .ok_or(ConversationError::NoPendingTurn)?;

        self.messages[index] = message;
        self.state = next;
        Ok(&self.messages[index])
    }
}

/// What a call to [`ChatSession::send`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Ignored,
    Listening,
    /// Voice input was requested but could not be started.
    SpeechUnavailable(String),
    Replied(ChatMessage),
    Failed(ChatMessage),
}

/// A conversation bound to a reply source.
pub struct ChatSession<R> {
    conversation: Conversation,
    source: R,
    labels: LinkLabels,
    speech: Box<dyn SpeechRecognizer>,
    listening: Option<Box<dyn SpeechHandle>>,
}

impl<R: ReplySource> ChatSession<R> {
    pub fn new(conversation: Conversation, source: R) -> Self {
        Self {
            conversation,
            source,
            labels: LinkLabels::default(),
            speech: Box::new(DisabledSpeech),
            listening: None,
        }
    }

    pub fn with_labels(mut self, labels: LinkLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_speech(mut self, speech: Box<dyn SpeechRecognizer>) -> Self {
        self.speech = speech;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn labels(&self) -> &LinkLabels {
        &self.labels
    }

    /// Run one submission to completion.
    pub async fn send(&mut self, text: &str) -> Result<TurnOutcome, ConversationError> {
        let submission = self.conversation.submit(text);
        if self.conversation.state() != &TurnState::Listening {
            self.release_speech();
        }

        match submission? {
            Submission::Ignored => Ok(TurnOutcome::Ignored),
            Submission::StartListening => {
                let options = SpeechOptions::new(self.conversation.language().locale());
                match self.speech.start(options) {
                    Ok(handle) => {
                        self.listening = Some(handle);
                        Ok(TurnOutcome::Listening)
                    }
                    Err(e) => {
                        warn!(error = %e, "voice input unavailable");
                        self.conversation.stop_listening();
                        Ok(TurnOutcome::SpeechUnavailable(e.to_string()))
                    }
                }
            }
            Submission::Turn { history } => {
                let language = self.conversation.language();
                match self.source.reply(&history, language).await {
                    Ok(reply) => {
                        let message = self.conversation.resolve(&reply, &self.labels)?;
                        Ok(TurnOutcome::Replied(message.clone()))
                    }
                    Err(e) => {
                        warn!(error = %e, "assistant turn failed");
                        let message = self.conversation.fail(&e.to_string())?;
                        Ok(TurnOutcome::Failed(message.clone()))
                    }
                }
            }
        }
    }

    pub fn stop_listening(&mut self) {
        self.conversation.stop_listening();
        self.release_speech();
    }

    fn release_speech(&mut self) {
        if let Some(mut handle) = self.listening.take() {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use folio_types::{ChatRole, Link, Project, Role};

    use super::*;
    use crate::assistant::AssistantError;
    use crate::speech::SpeechError;

    fn persona() -> Persona {
        Persona { name: "Ada".into(), title: "Rust engineer".into(), subtitle: Some("systems & tooling".into()) }
    }

    struct Canned(Result<&'static str, &'static str>);

    #[async_trait]
    impl ReplySource for Canned {
        async fn reply(&self, _history: &[Message], _language: Language) -> Result<String, AssistantError> {
            self.0.map(str::to_owned).map_err(|e| AssistantError::Endpoint {
                status: 500,
                error: e.to_owned(),
                details: None,
            })
        }
    }

    struct CountingHandle(Arc<AtomicUsize>);

    impl SpeechHandle for CountingHandle {
        fn stop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeSpeech(Arc<AtomicUsize>);

    impl SpeechRecognizer for FakeSpeech {
        fn start(&self, options: SpeechOptions) -> Result<Box<dyn SpeechHandle>, SpeechError> {
            assert_eq!(options.locale, "de-DE");
            Ok(Box::new(CountingHandle(Arc::clone(&self.0))))
        }
    }

    #[test]
    fn second_submit_rejected_while_pending() {
        let mut conv = Conversation::new(Language::En);
        assert!(matches!(conv.submit("first"), Ok(Submission::Turn { .. })));
        assert_eq!(conv.submit("second"), Err(ConversationError::TurnInFlight));
        assert_eq!(conv.messages().len(), 2);

        conv.resolve("done", &LinkLabels::default()).unwrap();
        assert!(matches!(conv.submit("second"), Ok(Submission::Turn { .. })));
    }

    #[test]
    fn errored_turn_allows_next_submission() {
        let mut conv = Conversation::new(Language::En);
        conv.submit("first").unwrap();
        let msg = conv.fail("network down").unwrap();
        assert_eq!(msg.content, "Something went wrong: network down");
        assert_eq!(conv.state(), &TurnState::Errored);
        assert!(matches!(conv.submit("again"), Ok(Submission::Turn { .. })));
    }

    #[test]
    fn placeholder_is_replaced_in_place() {
        let mut conv = Conversation::with_persona(Language::De, &persona());
        conv.submit("Was machst du?").unwrap();

        let pending_id = match conv.state() {
            TurnState::AwaitingReply { pending } => pending.clone(),
            other => panic!("unexpected state {other:?}"),
        };
        assert_eq!(conv.messages()[2].content, "Denke nach...");

        let labels = LinkLabels::from_projects(&[Project {
            name: "Orbit".into(),
            links: [("live".to_owned(), "https://orbit.test".to_owned())].into(),
        }]);
        conv.resolve("  Siehe https://orbit.test  ", &labels).unwrap();

        assert_eq!(conv.messages().len(), 3);
        let reply = &conv.messages()[2];
        assert_ne!(reply.id, pending_id);
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(reply.content, "Siehe https://orbit.test");
        assert_eq!(
            reply.links,
            Some(vec![Link { url: "https://orbit.test".into(), label: Some("Orbit — Live".into()) }])
        );
        assert_eq!(conv.state(), &TurnState::Resolved);
    }

    #[test]
    fn history_includes_intro_and_excludes_placeholder() {
        let mut conv = Conversation::with_persona(Language::En, &persona());
        let Ok(Submission::Turn { history }) = conv.submit("  Hello  ") else {
            panic!("expected a turn");
        };
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Assistant);
        assert!(history[0].content.starts_with("Hi! I'm Ada's chatbot"));
        assert!(history[0].content.ends_with("Rust engineer — systems & tooling."));
        assert_eq!(history[1], Message::user("Hello"));
    }

    #[test]
    fn trigger_word_starts_listening_without_turn() {
        let mut conv = Conversation::new(Language::En);
        assert_eq!(conv.submit(" Speak "), Ok(Submission::StartListening));
        assert_eq!(conv.state(), &TurnState::Listening);
        assert!(conv.messages().is_empty());

        assert_eq!(conv.submit(""), Ok(Submission::Ignored));
        assert_eq!(conv.state(), &TurnState::Idle);

        conv.submit("question").unwrap();
        assert_eq!(conv.submit("sprich"), Err(ConversationError::TurnInFlight));
    }

    #[test]
    fn transcript_submission_ends_listening() {
        let mut conv = Conversation::new(Language::En);
        conv.submit("speak").unwrap();
        assert!(matches!(conv.submit("tell me about Orbit"), Ok(Submission::Turn { .. })));
        assert!(conv.is_pending());
    }

    #[test]
    fn resolve_without_pending_turn_fails() {
        let mut conv = Conversation::new(Language::En);
        assert_eq!(
            conv.resolve("x", &LinkLabels::default()).err(),
            Some(ConversationError::NoPendingTurn)
        );
    }

    #[tokio::test]
    async fn session_resolves_turn() {
        let mut session = ChatSession::new(Conversation::new(Language::En), Canned(Ok("Hi **there**")));
        match session.send("hello").await.unwrap() {
            TurnOutcome::Replied(msg) => assert_eq!(msg.content, "Hi **there**"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.conversation().state(), &TurnState::Resolved);
        assert_eq!(session.send("   ").await.unwrap(), TurnOutcome::Ignored);
    }

    #[tokio::test]
    async fn session_turns_errors_into_messages() {
        let mut session = ChatSession::new(Conversation::new(Language::En), Canned(Err("boom")));
        match session.send("hello").await.unwrap() {
            TurnOutcome::Failed(msg) => assert_eq!(msg.content, "Something went wrong: boom"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.conversation().messages().len(), 2);
    }

    #[tokio::test]
    async fn session_without_speech_returns_to_idle() {
        let mut session = ChatSession::new(Conversation::new(Language::En), Canned(Ok("x")));
        let outcome = session.send("speak").await.unwrap();
        assert_eq!(outcome, TurnOutcome::SpeechUnavailable("Speech recognition not supported".into()));
        assert_eq!(session.conversation().state(), &TurnState::Idle);
    }

    #[tokio::test]
    async fn session_stops_recognizer_when_transcript_arrives() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut session = ChatSession::new(Conversation::new(Language::De), Canned(Ok("Antwort")))
            .with_speech(Box::new(FakeSpeech(Arc::clone(&stops))));

        assert_eq!(session.send("sprich").await.unwrap(), TurnOutcome::Listening);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        assert!(matches!(session.send("Erzähl von Orbit").await.unwrap(), TurnOutcome::Replied(_)));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
