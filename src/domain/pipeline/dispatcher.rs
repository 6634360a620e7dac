use crate::domain::voice::VoiceSpec;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::config::AudioFormat;
use crate::infrastructure::repositories::{ProviderRegistry, SynthesisRequest};
use futures::stream::{self, StreamExt, TryStreamExt};

/// A budget-conforming, independently synthesizable fragment with its
/// document-order index and resolved voice/provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    /// Wire payload: a `<speak>` fragment, or plain text.
    pub body: String,
    pub is_markup: bool,
    pub spec: VoiceSpec,
}

/// Audio bytes for one chunk, keyed by the originating chunk's index.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub index: usize,
    pub audio: Vec<u8>,
}

/// Per-document synthesis knobs forwarded to the provider clients.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub language: String,
    pub format: AudioFormat,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

/// Submit every chunk for synthesis, up to `concurrency` requests in
/// flight for this document, and gather the results in chunk-index
/// order. The registry's shared limiter additionally caps total
/// in-flight provider calls across concurrent documents.
///
/// The first failure aborts the remaining dispatch and discards any
/// audio already collected; the error carries the failing chunk's
/// index. Order is a property of the gather itself (`buffered`, not
/// `buffer_unordered`), so no re-sort is needed afterwards.
pub async fn dispatch(
    chunks: Vec<Chunk>,
    registry: &ProviderRegistry,
    settings: &SynthesisSettings,
    concurrency: usize,
) -> PipelineResult<Vec<SynthesisResult>> {
    let total = chunks.len();
    tracing::info!(
        chunk_count = total,
        concurrency = concurrency,
        "Dispatching chunks for synthesis"
    );

    let results: Vec<SynthesisResult> = stream::iter(chunks.into_iter().map(|chunk| {
        let client = registry.get(chunk.spec.provider);
        let limiter = registry.limiter();
        let settings = settings.clone();
        async move {
            let client = client.ok_or_else(|| PipelineError::Synthesis {
                index: chunk.index,
                message: format!(
                    "no client configured for provider {}",
                    chunk.spec.provider
                ),
            })?;

            // One permit per external call, shared across all documents
            // in flight. Held until the provider responds.
            let _permit =
                limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| PipelineError::Synthesis {
                        index: chunk.index,
                        message: "provider limiter closed".to_string(),
                    })?;

            tracing::info!(
                chunk_index = chunk.index,
                body_bytes = chunk.body.len(),
                provider = %chunk.spec.provider,
                voice = chunk.spec.voice.as_deref().unwrap_or("<default>"),
                "Synthesizing chunk"
            );

            let request = SynthesisRequest {
                body: &chunk.body,
                is_markup: chunk.is_markup,
                voice: chunk.spec.voice.as_deref(),
                language: &settings.language,
                format: settings.format,
                speaking_rate: settings.speaking_rate,
                pitch: settings.pitch,
                volume_gain_db: settings.volume_gain_db,
            };

            let audio = client
                .synthesize(&request)
                .await
                .map_err(|message| PipelineError::Synthesis {
                    index: chunk.index,
                    message,
                })?;

            Ok::<SynthesisResult, PipelineError>(SynthesisResult {
                index: chunk.index,
                audio,
            })
        }
    }))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    tracing::info!(result_count = results.len(), "All chunks synthesized");
    debug_assert_eq!(results.len(), total);
    Ok(results)
}
