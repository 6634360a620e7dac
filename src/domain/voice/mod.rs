pub mod segmenter;

pub use segmenter::{segment, VoiceSegment};

use std::fmt;
use std::str::FromStr;

/// The synthesis providers a voice section may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    ElevenLabs,
    Minimax,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "elevenlabs" => Ok(Provider::ElevenLabs),
            "minimax" => Ok(Provider::Minimax),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => write!(f, "google"),
            Provider::ElevenLabs => write!(f, "elevenlabs"),
            Provider::Minimax => write!(f, "minimax"),
        }
    }
}

/// Resolved voice and provider for one segment of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSpec {
    /// Provider-specific voice name or id; `None` lets the provider
    /// pick its default.
    pub voice: Option<String>,
    pub provider: Provider,
}

/// Document-level defaults threaded in from configuration. No ambient
/// globals: every component receives these explicitly.
#[derive(Debug, Clone)]
pub struct SpeechDefaults {
    pub voice: Option<String>,
    pub provider: Provider,
}
