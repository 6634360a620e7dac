use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicetape::batch::{self, BatchOptions};
use voicetape::domain::pipeline::{PipelineService, PipelineSettings};
use voicetape::domain::voice::{Provider, SpeechDefaults};
use voicetape::infrastructure::audio::FfmpegMerger;
use voicetape::infrastructure::config::{
    validate_byte_budget, AudioFormat, Config, LogFormat,
};
use voicetape::infrastructure::repositories::{
    ElevenLabsTtsRepository, GoogleTtsRepository, MinimaxTtsRepository, ProviderRegistry,
};

/// Turn marked-up narration documents into audio artifacts.
#[derive(Parser, Debug)]
#[command(name = "voicetape")]
struct Cli {
    /// Narration file, or a directory of .ssml/.txt files
    input: PathBuf,

    /// Output audio file, or output directory in batch mode
    output: PathBuf,

    /// Synthesis provider override: google, elevenlabs or minimax
    #[arg(long)]
    provider: Option<String>,

    /// Voice name or id; appended to the output filename
    #[arg(long)]
    voice: Option<String>,

    /// Audio format: mp3, linear16 or ogg_opus
    #[arg(long)]
    format: Option<String>,

    /// Per-request byte budget override
    #[arg(long)]
    budget: Option<usize>,

    /// Treat input as markup even without a <speak> root
    #[arg(long)]
    ssml: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    init_logging(&config);

    // CLI flags win over the environment.
    if let Some(provider) = &cli.provider {
        config.default_provider = provider
            .parse::<Provider>()
            .map_err(|e| anyhow::anyhow!("--provider: {}", e))?;
    }
    if let Some(voice) = &cli.voice {
        config.default_voice = Some(voice.clone());
    }
    if let Some(format) = &cli.format {
        config.audio_format = format
            .parse::<AudioFormat>()
            .map_err(|e| anyhow::anyhow!("--format: {}", e))?;
    }
    if let Some(budget) = cli.budget {
        validate_byte_budget(budget).map_err(|e| anyhow::anyhow!("--budget: {}", e))?;
        config.byte_budget = budget;
    }

    tracing::info!(
        provider = %config.default_provider,
        byte_budget = config.byte_budget,
        format = config.audio_format.extension(),
        "Starting voicetape"
    );

    let registry = Arc::new(build_registry(&config));
    if registry.is_empty() {
        tracing::warn!(
            "No provider API keys configured; every synthesis request will fail. \
             Set GOOGLE_TTS_API_KEY, ELEVENLABS_API_KEY or MINIMAX_API_KEY."
        );
    }
    let merger = Arc::new(FfmpegMerger::new(config.ffmpeg_path.clone()));
    let service = Arc::new(PipelineService::new(
        registry,
        merger,
        pipeline_settings(&config),
    ));

    if cli.input.is_dir() {
        let options = BatchOptions {
            input_root: cli.input.clone(),
            output_root: cli.output.clone(),
            audio_extension: config.audio_format.extension(),
            voice: cli.voice.clone(),
            force_markup: cli.ssml,
            worker_count: config.worker_count,
        };
        let summary = batch::run(service, &options).await;
        if summary.failed > 0 {
            anyhow::bail!("{} of {} documents failed", summary.failed, summary.total);
        }
        Ok(())
    } else {
        let output = batch::voice_suffixed(&cli.output, cli.voice.as_deref());
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let force_markup = cli.ssml || batch::has_extension(&cli.input, "ssml");
        batch::process_file(&service, &cli.input, &output, force_markup).await
    }
}

fn build_registry(config: &Config) -> ProviderRegistry {
    let http = reqwest::Client::new();
    let mut registry = ProviderRegistry::new(config.provider_concurrency);
    if let Some(key) = &config.google_api_key {
        registry.register(
            Provider::Google,
            Arc::new(GoogleTtsRepository::new(http.clone(), key.clone())),
        );
    }
    if let Some(key) = &config.elevenlabs_api_key {
        registry.register(
            Provider::ElevenLabs,
            Arc::new(ElevenLabsTtsRepository::new(http.clone(), key.clone())),
        );
    }
    if let Some(key) = &config.minimax_api_key {
        registry.register(
            Provider::Minimax,
            Arc::new(MinimaxTtsRepository::new(http.clone(), key.clone())),
        );
    }
    registry
}

fn pipeline_settings(config: &Config) -> PipelineSettings {
    PipelineSettings {
        byte_budget: config.byte_budget,
        defaults: SpeechDefaults {
            voice: config.default_voice.clone(),
            provider: config.default_provider,
        },
        language: config.language.clone(),
        format: config.audio_format,
        dispatch_concurrency: config.dispatch_concurrency,
        speaking_rate: config.speaking_rate,
        pitch: config.pitch,
        volume_gain_db: config.volume_gain_db,
    }
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "voicetape=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "voicetape=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
