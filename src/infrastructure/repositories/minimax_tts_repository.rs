use super::synthesis_repository::{SynthesisRepository, SynthesisRequest};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;

const MINIMAX_TTS_URL: &str = "https://api.minimax.chat/v1/t2a_pro";
const DEFAULT_VOICE_ID: &str = "female-shaonv";
const DEFAULT_MODEL_ID: &str = "speech-02-hd";

/// MiniMax implementation of the synthesis repository. MiniMax has no
/// markup dialect of its own (pauses use a proprietary `<#x#>` inline
/// form), so the chunk body is sent as-is in the `text` field. The
/// response is either JSON with base64 `audio_data` or the raw audio
/// body, depending on the account tier.
pub struct MinimaxTtsRepository {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
}

impl MinimaxTtsRepository {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model_id: DEFAULT_MODEL_ID.to_string(),
        }
    }
}

#[async_trait]
impl SynthesisRepository for MinimaxTtsRepository {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, String> {
        let voice_id = request.voice.unwrap_or(DEFAULT_VOICE_ID);
        // MiniMax volume is linear, not dB.
        let volume = (1.0 + request.volume_gain_db / 20.0).clamp(0.1, 2.0);

        let payload = json!({
            "model": self.model_id,
            "text": request.body,
            "voice_setting": {
                "voice_id": voice_id,
                "speed": request.speaking_rate,
                "vol": volume,
                "pitch": request.pitch as i32,
            },
            "audio_setting": {
                "format": request.format.extension(),
                "sample_rate": 32000,
                "bitrate": 128000,
                "channel": 1,
            }
        });

        tracing::info!(
            provider = "minimax",
            voice = voice_id,
            model = %self.model_id,
            body_bytes = request.body.len(),
            "Calling MiniMax text-to-speech"
        );

        let response = self
            .client
            .post(MINIMAX_TTS_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("MiniMax request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "minimax",
                status = %status,
                response_body = %body,
                "MiniMax returned an error"
            );
            return Err(format!("MiniMax error ({}): {}", status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("MiniMax audio stream failed: {}", e))?;

        // Prefer the JSON envelope; fall back to treating the body as
        // raw audio.
        if let Ok(envelope) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            if let Some(encoded) = envelope.get("audio_data").and_then(|v| v.as_str()) {
                return BASE64
                    .decode(encoded.as_bytes())
                    .map_err(|e| format!("MiniMax audio_data was not valid base64: {}", e));
            }
        }

        tracing::debug!(audio_size = bytes.len(), "MiniMax raw audio received");
        Ok(bytes.to_vec())
    }
}
