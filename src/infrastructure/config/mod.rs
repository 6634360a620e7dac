use crate::domain::markup::SPEAK_WRAPPER_OVERHEAD;
use crate::domain::voice::Provider;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Per-fragment payload ceiling in bytes. Must leave room for the
    /// `<speak>` wrapper.
    pub byte_budget: usize,
    pub default_voice: Option<String>,
    pub default_provider: Provider,
    pub language: String,
    pub audio_format: AudioFormat,
    /// In-flight synthesis requests per document.
    pub dispatch_concurrency: usize,
    /// Total in-flight provider requests across all documents.
    pub provider_concurrency: usize,
    /// Parallel documents in batch mode.
    pub worker_count: usize,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
    pub google_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub minimax_api_key: Option<String>,
    pub ffmpeg_path: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Linear16,
    OggOpus,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Linear16 => "wav",
            AudioFormat::OggOpus => "ogg",
        }
    }

    /// Encoding name used by the Google synthesis API.
    pub fn google_encoding(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Linear16 => "LINEAR16",
            AudioFormat::OggOpus => "OGG_OPUS",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "linear16" | "wav" => Ok(AudioFormat::Linear16),
            "ogg_opus" | "ogg" => Ok(AudioFormat::OggOpus),
            other => Err(format!("unknown audio format: {}", other)),
        }
    }
}

/// Floor check for the per-request payload ceiling, shared by the env
/// path and the CLI override.
pub fn validate_byte_budget(budget: usize) -> Result<(), String> {
    if budget <= SPEAK_WRAPPER_OVERHEAD + 64 {
        return Err(format!(
            "byte budget of {} leaves no room for the wrapper and content",
            budget
        ));
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let byte_budget: usize = env::var("TTS_BYTE_BUDGET")
            .unwrap_or_else(|_| "4500".to_string())
            .parse()?;
        validate_byte_budget(byte_budget).map_err(|e| anyhow::anyhow!("TTS_BYTE_BUDGET: {}", e))?;

        let config = Config {
            byte_budget,
            default_voice: env::var("TTS_DEFAULT_VOICE").ok(),
            default_provider: env::var("TTS_PROVIDER")
                .unwrap_or_else(|_| "google".to_string())
                .parse::<Provider>()
                .map_err(|e| anyhow::anyhow!("TTS_PROVIDER: {}", e))?,
            language: env::var("TTS_LANGUAGE").unwrap_or_else(|_| "en-US".to_string()),
            audio_format: env::var("TTS_AUDIO_FORMAT")
                .unwrap_or_else(|_| "mp3".to_string())
                .parse::<AudioFormat>()
                .map_err(|e| anyhow::anyhow!("TTS_AUDIO_FORMAT: {}", e))?,
            dispatch_concurrency: env::var("TTS_DISPATCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            provider_concurrency: env::var("TTS_PROVIDER_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()?,
            worker_count: env::var("TTS_WORKER_COUNT")
                .unwrap_or_else(|_| "4".to_string())
                .parse()?,
            speaking_rate: env::var("TTS_SPEAKING_RATE")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            pitch: env::var("TTS_PITCH")
                .unwrap_or_else(|_| "0.0".to_string())
                .parse()?,
            volume_gain_db: env::var("TTS_VOLUME_GAIN_DB")
                .unwrap_or_else(|_| "0.0".to_string())
                .parse()?,
            google_api_key: env::var("GOOGLE_TTS_API_KEY").ok(),
            elevenlabs_api_key: env::var("ELEVENLABS_API_KEY").ok(),
            minimax_api_key: env::var("MINIMAX_API_KEY").ok(),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_floor_rejects_wrapper_sized_values() {
        assert!(validate_byte_budget(0).is_err());
        assert!(validate_byte_budget(SPEAK_WRAPPER_OVERHEAD + 64).is_err());
        assert!(validate_byte_budget(SPEAK_WRAPPER_OVERHEAD + 65).is_ok());
        assert!(validate_byte_budget(4500).is_ok());
    }

    #[test]
    fn test_audio_format_parses_aliases() {
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Linear16);
        assert_eq!("OGG".parse::<AudioFormat>().unwrap(), AudioFormat::OggOpus);
        assert!("flac".parse::<AudioFormat>().is_err());
    }
}
