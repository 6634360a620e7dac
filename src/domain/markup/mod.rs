pub mod error;
pub mod model;
pub mod parser;

pub use error::ParseError;
pub use model::{
    Block, MarkupDocument, render_speak, BLOCK_LINE_OVERHEAD, SPEAK_WRAPPER_OVERHEAD,
};
pub use parser::{is_markup, parse, parse_with_repair, repair_entities};
