use crate::infrastructure::config::AudioFormat;
use async_trait::async_trait;

/// One bounded synthesis request: a single fragment, a single voice.
///
/// The body is guaranteed by the chunker to stay under the configured
/// byte budget (the oversized-atomic case is sub-split before dispatch),
/// so implementations never need to split or merge themselves.
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    /// Chunk payload: a wrapped `<speak>` fragment, or plain text.
    pub body: &'a str,
    pub is_markup: bool,
    /// Provider-specific voice name or id; `None` lets the provider
    /// choose its default.
    pub voice: Option<&'a str>,
    pub language: &'a str,
    pub format: AudioFormat,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

/// Repository for single-fragment speech synthesis.
/// Abstracts the underlying provider (Google, ElevenLabs, MiniMax).
///
/// Implementations are responsible for:
/// - Provider-specific request formatting and authentication
/// - Decoding the provider's response into raw audio bytes
///
/// They are explicitly NOT responsible for splitting oversized input or
/// retrying failures; both belong to the pipeline's caller-facing
/// policy.
#[async_trait]
pub trait SynthesisRepository: Send + Sync {
    /// Synthesize one bounded fragment into complete audio bytes.
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, String>;
}
