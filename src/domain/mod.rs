pub mod chunking;
pub mod markup;
pub mod pipeline;
pub mod voice;
