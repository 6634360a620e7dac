use super::dispatcher::SynthesisResult;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::audio::AudioMerger;
use crate::infrastructure::config::AudioFormat;
use std::path::Path;

/// Concatenate ordered synthesis results into the final artifact.
///
/// Results must already be sorted by index and contiguous from zero
/// (the dispatcher's contract); any gap aborts. A single result is
/// written straight to the output path. Intermediate per-chunk files
/// live in a scratch directory that is removed on every exit path, and
/// a failed merge also removes whatever landed at the output path, so
/// no partial artifact ever survives a failure.
pub async fn assemble(
    results: Vec<SynthesisResult>,
    output: &Path,
    merger: &dyn AudioMerger,
    format: AudioFormat,
) -> PipelineResult<()> {
    if results.is_empty() {
        return Err(PipelineError::Assembly(
            "no synthesis results to assemble".to_string(),
        ));
    }

    for (position, result) in results.iter().enumerate() {
        if result.index != position {
            return Err(PipelineError::Assembly(format!(
                "missing result for chunk {} (got index {})",
                position, result.index
            )));
        }
    }

    if results.len() == 1 {
        tracing::info!(
            audio_size = results[0].audio.len(),
            output = %output.display(),
            "Single chunk, writing artifact directly"
        );
        if let Err(e) = tokio::fs::write(output, &results[0].audio).await {
            let _ = tokio::fs::remove_file(output).await;
            return Err(e.into());
        }
        return Ok(());
    }

    // Dropped at the end of this function on success and failure alike.
    let scratch = tempfile::tempdir()?;
    let mut segment_paths = Vec::with_capacity(results.len());
    for result in &results {
        let path = scratch
            .path()
            .join(format!("chunk-{:04}.{}", result.index, format.extension()));
        tokio::fs::write(&path, &result.audio).await?;
        segment_paths.push(path);
    }

    tracing::info!(
        segments = segment_paths.len(),
        output = %output.display(),
        "Assembling audio artifact"
    );

    if let Err(message) = merger.merge(&segment_paths, output).await {
        let _ = tokio::fs::remove_file(output).await;
        return Err(PipelineError::Assembly(message));
    }

    Ok(())
}
