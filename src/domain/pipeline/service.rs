use super::assembler;
use super::dispatcher::{self, Chunk, SynthesisSettings};
use crate::domain::chunking::{chunker, fallback};
use crate::domain::markup::{is_markup, parse_with_repair, render_speak, Block, MarkupDocument};
use crate::domain::voice::{segment, SpeechDefaults, VoiceSpec};
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::audio::AudioMerger;
use crate::infrastructure::config::AudioFormat;
use crate::infrastructure::repositories::ProviderRegistry;
use std::path::Path;
use std::sync::Arc;

/// Everything one pipeline invocation needs to know; threaded in
/// explicitly, no ambient globals.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub byte_budget: usize,
    pub defaults: SpeechDefaults,
    pub language: String,
    pub format: AudioFormat,
    pub dispatch_concurrency: usize,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub volume_gain_db: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NarrationOutcome {
    pub segment_count: usize,
    pub chunk_count: usize,
    /// Whether the entity-repair pass was needed to parse the input.
    pub repaired: bool,
    /// Whether heuristic raw splitting had to stand in for structured
    /// chunking.
    pub degraded: bool,
}

/// Orchestrates one document through
/// parse → segment → chunk → dispatch → assemble.
///
/// Holds no per-document state; a failed run leaves no artifact and no
/// temporary files behind. Retry policy belongs to the caller.
pub struct PipelineService {
    registry: Arc<ProviderRegistry>,
    merger: Arc<dyn AudioMerger>,
    settings: PipelineSettings,
}

impl PipelineService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        merger: Arc<dyn AudioMerger>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            merger,
            settings,
        }
    }

    /// Turn one narration document into one audio artifact at `output`.
    pub async fn narrate(&self, raw: &str, output: &Path) -> PipelineResult<NarrationOutcome> {
        let structured = is_markup(raw);
        let mut outcome = NarrationOutcome {
            segment_count: 0,
            chunk_count: 0,
            repaired: false,
            degraded: false,
        };

        let chunks = match parse_with_repair(raw) {
            Ok((doc, repaired)) => {
                outcome.repaired = repaired;
                tracing::info!(
                    blocks = doc.blocks.len(),
                    structured = structured,
                    repaired = repaired,
                    "Document parsed"
                );
                self.chunk_document(&doc, structured, &mut outcome)?
            }
            Err(parse_err) if structured => {
                // Degrade to markup-agnostic splitting, but as an
                // observable transition rather than a swallowed error.
                tracing::warn!(
                    error = %parse_err,
                    "Markup unparseable after repair, using heuristic splitting"
                );
                outcome.degraded = true;
                let bodies = fallback::split_raw(raw, self.settings.byte_budget)?;
                outcome.segment_count = 1;
                bodies
                    .into_iter()
                    .enumerate()
                    .map(|(index, body)| Chunk {
                        index,
                        body,
                        is_markup: true,
                        spec: VoiceSpec {
                            voice: self.settings.defaults.voice.clone(),
                            provider: self.settings.defaults.provider,
                        },
                    })
                    .collect()
            }
            Err(parse_err) => return Err(parse_err.into()),
        };

        if chunks.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }
        outcome.chunk_count = chunks.len();
        tracing::info!(
            chunk_count = outcome.chunk_count,
            segment_count = outcome.segment_count,
            "Document chunked"
        );

        let synthesis_settings = SynthesisSettings {
            language: self.settings.language.clone(),
            format: self.settings.format,
            speaking_rate: self.settings.speaking_rate,
            pitch: self.settings.pitch,
            volume_gain_db: self.settings.volume_gain_db,
        };
        let results = dispatcher::dispatch(
            chunks,
            &self.registry,
            &synthesis_settings,
            self.settings.dispatch_concurrency,
        )
        .await?;

        assembler::assemble(results, output, self.merger.as_ref(), self.settings.format).await?;

        tracing::info!(
            output = %output.display(),
            chunk_count = outcome.chunk_count,
            "Narration complete"
        );
        Ok(outcome)
    }

    /// Segment the document per voice and pack each segment, sub-
    /// splitting any block the chunker flags as oversized, then retry
    /// packing until it fits. Chunk indices are global across segments
    /// so the assembler reproduces the original reading order.
    fn chunk_document(
        &self,
        doc: &MarkupDocument,
        structured: bool,
        outcome: &mut NarrationOutcome,
    ) -> PipelineResult<Vec<Chunk>> {
        let budget = self.settings.byte_budget;
        let segments = segment(doc, &self.settings.defaults);
        outcome.segment_count = segments.len();
        tracing::info!(segment_count = segments.len(), "Document segmented by voice");

        let mut chunks: Vec<Chunk> = Vec::new();
        for seg in segments {
            let mut blocks = seg.blocks;
            let packed = loop {
                match chunker::pack(&blocks, budget) {
                    Ok(packed) => break packed,
                    Err(needs_fallback) => {
                        let position = needs_fallback.position;
                        tracing::info!(
                            position = position,
                            block_bytes = blocks[position].serialized_len(),
                            "Block exceeds budget, splitting at sentence boundaries"
                        );
                        let replacement = fallback::split_block(&blocks[position], budget)?;
                        blocks.splice(position..=position, replacement);
                    }
                }
            };

            for group in packed {
                let body = if structured {
                    render_speak(&group)
                } else {
                    group.iter().map(Block::plain_text).collect()
                };
                chunks.push(Chunk {
                    index: chunks.len(),
                    body,
                    is_markup: structured,
                    spec: seg.spec.clone(),
                });
            }
        }

        Ok(chunks)
    }
}
