use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A supported content / answer language.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::De];

    /// Resolve an optional, untrusted language code.
    ///
    /// Accepts bare codes (`"de"`) and locale tags (`"de-DE"`, `"en_US"`).
    /// Anything unsupported resolves to the default language.
    pub fn resolve(code: Option<&str>) -> Self {
        code.map(str::trim)
            .and_then(|c| c.split(['-', '_']).next())
            .and_then(|c| c.parse().ok())
            .unwrap_or_default()
    }

    /// The two-letter code used in content directory names.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }

    /// English name of the language, as used in prompt instructions.
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::De => "German",
        }
    }

    /// BCP-47 locale handed to speech recognition.
    pub fn locale(self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::De => "de-DE",
        }
    }

    pub fn is_default(self) -> bool {
        self == Language::default()
    }
}
