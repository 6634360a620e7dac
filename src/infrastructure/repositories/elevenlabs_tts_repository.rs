use super::synthesis_repository::{SynthesisRepository, SynthesisRequest};
use async_trait::async_trait;
use serde_json::json;

/// Voice used when a chunk carries no explicit voice id ("Rachel").
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2_5";

/// ElevenLabs implementation of the synthesis repository. The API
/// accepts both plain text and markup in the same `text` field and
/// responds with raw MP3 bytes.
pub struct ElevenLabsTtsRepository {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
}

impl ElevenLabsTtsRepository {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }
}

#[async_trait]
impl SynthesisRepository for ElevenLabsTtsRepository {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, String> {
        let voice_id = request.voice.unwrap_or(DEFAULT_VOICE_ID);
        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", voice_id);

        let payload = json!({
            "text": request.body,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.5,
                "style": 0.0,
                "use_speaker_boost": true,
            }
        });

        tracing::info!(
            provider = "elevenlabs",
            voice = voice_id,
            model = %self.model_id,
            body_bytes = request.body.len(),
            "Calling ElevenLabs text-to-speech"
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("ElevenLabs request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "elevenlabs",
                status = %status,
                response_body = %body,
                "ElevenLabs returned an error"
            );
            return Err(format!("ElevenLabs error ({}): {}", status, body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| format!("ElevenLabs audio stream failed: {}", e))?
            .to_vec();

        tracing::debug!(audio_size = audio.len(), "ElevenLabs audio received");
        Ok(audio)
    }
}
