use crate::domain::chunking::ChunkingError;
use crate::domain::markup::ParseError;

/// Terminal error for one document's pipeline run. All variants are
/// fatal: the core performs no retries and never emits partial output.
/// Batch-level callers decide whether to retry or skip the document.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("markup parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("chunking failed: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("document contains no synthesizable content")]
    EmptyDocument,

    #[error("synthesis failed for chunk {index}: {message}")]
    Synthesis { index: usize, message: String },

    #[error("assembly failed: {0}")]
    Assembly(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
