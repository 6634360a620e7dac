pub mod chunker;
pub mod error;
pub mod fallback;

pub use chunker::{pack, NeedsFallback};
pub use error::ChunkingError;
