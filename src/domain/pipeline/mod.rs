pub mod assembler;
pub mod dispatcher;
pub mod service;

pub use dispatcher::{Chunk, SynthesisResult, SynthesisSettings};
pub use service::{NarrationOutcome, PipelineService, PipelineSettings};
