//! Speech-input capability.
//!
//! Recognition is provided by the host (a browser, an OS service). The
//! assistant only starts and stops it; transcripts come back through the
//! normal submit path.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech recognition not supported")]
    Unsupported,

    #[error("speech recognition failed to start: {0}")]
    Start(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechOptions {
    /// BCP-47 locale, e.g. `de-DE`.
    pub locale: String,
    pub continuous: bool,
    pub interim_results: bool,
    /// Restart automatically after the recogniser ends or errors.
    pub keep_alive: bool,
    pub restart_delay: Duration,
}

impl SpeechOptions {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            continuous: true,
            interim_results: true,
            keep_alive: false,
            restart_delay: Duration::from_millis(300),
        }
    }
}

/// A running recognition session.
pub trait SpeechHandle: Send {
    fn stop(&mut self);
}

pub trait SpeechRecognizer: Send + Sync {
    fn start(&self, options: SpeechOptions) -> Result<Box<dyn SpeechHandle>, SpeechError>;
}

/// Recogniser for targets without speech input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSpeech;

impl SpeechRecognizer for DisabledSpeech {
    fn start(&self, _options: SpeechOptions) -> Result<Box<dyn SpeechHandle>, SpeechError> {
        Err(SpeechError::Unsupported)
    }
}
