//! Batch driver: walk a directory of narration files and narrate each
//! one, mirroring the directory structure under the output root. One
//! failed document never stops its siblings; failures are tallied and
//! reported at the end.

use crate::domain::markup::is_markup;
use crate::domain::pipeline::PipelineService;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

pub struct BatchOptions {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// Output file extension for the configured audio format.
    pub audio_extension: &'static str,
    /// Appended to every output filename when set.
    pub voice: Option<String>,
    /// Treat every file as markup even without a `<speak>` root.
    pub force_markup: bool,
    pub worker_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

/// Narrate every `.ssml` and `.txt` file under the input root, up to
/// `worker_count` documents in parallel.
pub async fn run(service: Arc<PipelineService>, options: &BatchOptions) -> BatchSummary {
    let files: Vec<PathBuf> = WalkDir::new(&options.input_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, "ssml") || has_extension(path, "txt"))
        .collect();

    if files.is_empty() {
        tracing::warn!(input = %options.input_root.display(), "No .ssml or .txt files found");
        return BatchSummary {
            succeeded: 0,
            failed: 0,
            total: 0,
        };
    }
    tracing::info!(file_count = files.len(), "Batch processing narration files");

    let succeeded = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let total = files.len();

    stream::iter(files)
        .for_each_concurrent(options.worker_count.max(1), |file| {
            let service = service.clone();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            async move {
                // Mirror the input directory structure under the output root.
                let relative = file.strip_prefix(&options.input_root).unwrap_or(&file);
                let output = voice_suffixed(
                    &options
                        .output_root
                        .join(relative)
                        .with_extension(options.audio_extension),
                    options.voice.as_deref(),
                );
                if let Some(parent) = output.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        tracing::error!(file = %file.display(), error = %e, "Cannot create output directory");
                        failed.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                }

                let force_markup = options.force_markup || has_extension(&file, "ssml");
                match process_file(&service, &file, &output, force_markup).await {
                    Ok(()) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                    }
                    // One failed document never stops its siblings.
                    Err(e) => {
                        tracing::error!(file = %file.display(), error = %e, "Document failed");
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
        .await;

    let summary = BatchSummary {
        succeeded: succeeded.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        total,
    };
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        total = summary.total,
        "Batch processing complete"
    );
    summary
}

/// Narrate one file to one output path.
pub async fn process_file(
    service: &PipelineService,
    input: &Path,
    output: &Path,
    force_markup: bool,
) -> anyhow::Result<()> {
    let mut raw = tokio::fs::read_to_string(input).await?;
    if raw.trim().is_empty() {
        anyhow::bail!("{} is empty", input.display());
    }
    if force_markup && !is_markup(&raw) {
        raw = format!("<speak>\n{}\n</speak>", raw.trim());
    }

    let outcome = service.narrate(&raw, output).await?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        chunks = outcome.chunk_count,
        segments = outcome.segment_count,
        repaired = outcome.repaired,
        degraded = outcome.degraded,
        "Document narrated"
    );
    Ok(())
}

pub fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// Append the voice name to the output filename, `story.mp3` →
/// `story_rachel.mp3`, so per-voice renders of the same document do not
/// overwrite each other.
pub fn voice_suffixed(output: &Path, voice: Option<&str>) -> PathBuf {
    match voice {
        Some(voice) => {
            let stem = output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = match output.extension() {
                Some(ext) => format!("{}_{}.{}", stem, voice, ext.to_string_lossy()),
                None => format!("{}_{}", stem, voice),
            };
            output.with_file_name(name)
        }
        None => output.to_path_buf(),
    }
}
