use super::synthesis_repository::{SynthesisRepository, SynthesisRequest};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;

/// Google Cloud Text-to-Speech REST endpoint. Accepts JSON and returns
/// base64-encoded audio in the `audioContent` field.
const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Google Cloud TTS implementation of the synthesis repository.
pub struct GoogleTtsRepository {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GoogleSynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

impl GoogleTtsRepository {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SynthesisRepository for GoogleTtsRepository {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, String> {
        let input_kind = if request.is_markup { "ssml" } else { "text" };

        let mut voice = json!({ "languageCode": request.language });
        if let Some(name) = request.voice {
            voice["name"] = json!(name);
        }

        let payload = json!({
            "input": { input_kind: request.body },
            "voice": voice,
            "audioConfig": {
                "audioEncoding": request.format.google_encoding(),
                "speakingRate": request.speaking_rate,
                "pitch": request.pitch,
                "volumeGainDb": request.volume_gain_db,
            }
        });

        tracing::info!(
            provider = "google",
            voice = request.voice.unwrap_or("<default>"),
            language = request.language,
            body_bytes = request.body.len(),
            input_kind = input_kind,
            "Calling Google TTS synthesize"
        );

        let response = self
            .client
            .post(GOOGLE_TTS_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("Google TTS request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "google",
                status = %status,
                response_body = %body,
                "Google TTS returned an error"
            );
            return Err(format!("Google TTS error ({}): {}", status, body));
        }

        let parsed: GoogleSynthesizeResponse = response
            .json()
            .await
            .map_err(|e| format!("Google TTS returned unexpected response: {}", e))?;

        let audio = BASE64
            .decode(parsed.audio_content.as_bytes())
            .map_err(|e| format!("Google TTS audio content was not valid base64: {}", e))?;

        tracing::debug!(audio_size = audio.len(), "Google TTS audio decoded");
        Ok(audio)
    }
}
