/// One self-contained element of a narration document.
///
/// The variant set is closed on purpose: every stage downstream
/// (segmentation, chunking, fallback splitting) pattern-matches
/// exhaustively, so adding a new element kind is a compile-time-checked
/// change rather than a runtime type test.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// `<p>` paragraph containing inline content.
    Paragraph { children: Vec<Block> },
    /// `<s>` sentence.
    Sentence { children: Vec<Block> },
    /// `<break time="800ms"/>` pause directive.
    Break { time: Option<String> },
    /// `<emphasis level="strong">` span.
    Emphasis { level: Option<String>, children: Vec<Block> },
    /// `<voice name="..." provider="...">` speaker section.
    /// Voice sections never nest; the parser rejects nesting.
    Voice {
        name: String,
        provider: Option<String>,
        children: Vec<Block>,
    },
    /// Bare character data.
    Text(String),
}

/// A parsed narration document: an ordered sequence of top-level blocks.
/// Immutable once parsed; blocks preserve source order.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupDocument {
    pub blocks: Vec<Block>,
}

/// Serialized size of an empty `<speak>\n</speak>` wrapper.
pub const SPEAK_WRAPPER_OVERHEAD: usize = 16;

/// Indentation plus newline added around each top-level block when a
/// chunk is rendered.
pub const BLOCK_LINE_OVERHEAD: usize = 3;

impl Block {
    /// Render this block back to markup. Character data is re-escaped,
    /// so the output always re-parses.
    pub fn serialize(&self) -> String {
        match self {
            Block::Paragraph { children } => {
                format!("<p>{}</p>", serialize_children(children))
            }
            Block::Sentence { children } => {
                format!("<s>{}</s>", serialize_children(children))
            }
            Block::Break { time } => match time {
                Some(t) => format!("<break time=\"{}\"/>", escape_attr(t)),
                None => "<break/>".to_string(),
            },
            Block::Emphasis { level, children } => match level {
                Some(l) => format!(
                    "<emphasis level=\"{}\">{}</emphasis>",
                    escape_attr(l),
                    serialize_children(children)
                ),
                None => format!("<emphasis>{}</emphasis>", serialize_children(children)),
            },
            Block::Voice {
                name,
                provider,
                children,
            } => {
                let mut open = format!("<voice name=\"{}\"", escape_attr(name));
                if let Some(p) = provider {
                    open.push_str(&format!(" provider=\"{}\"", escape_attr(p)));
                }
                format!("{}>{}</voice>", open, serialize_children(children))
            }
            Block::Text(text) => escape_text(text),
        }
    }

    /// Serialized byte length of this block alone.
    pub fn serialized_len(&self) -> usize {
        self.serialize().len()
    }

    /// Flatten this block to its spoken text, dropping markup.
    /// Pause directives contribute a single space so words on either
    /// side do not run together.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Paragraph { children }
            | Block::Sentence { children }
            | Block::Emphasis { children, .. }
            | Block::Voice { children, .. } => children
                .iter()
                .map(Block::plain_text)
                .collect::<Vec<_>>()
                .join(""),
            Block::Break { .. } => " ".to_string(),
            Block::Text(text) => text.clone(),
        }
    }
}

fn serialize_children(children: &[Block]) -> String {
    children.iter().map(Block::serialize).collect()
}

/// Wrap a run of sibling blocks in a minimal valid `<speak>` root,
/// one block per indented line. This is the wire form sent to a
/// synthesis provider; its size is what the chunker budgets against.
pub fn render_speak(blocks: &[Block]) -> String {
    let mut out = String::from("<speak>\n");
    for block in blocks {
        out.push_str("  ");
        out.push_str(&block.serialize());
        out.push('\n');
    }
    out.push_str("</speak>");
    out
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

impl MarkupDocument {
    pub fn serialize(&self) -> String {
        render_speak(&self.blocks)
    }

    pub fn serialized_len(&self) -> usize {
        self.serialize().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_overhead_matches_render() {
        assert_eq!(render_speak(&[]).len(), SPEAK_WRAPPER_OVERHEAD);
    }

    #[test]
    fn test_block_line_overhead_matches_render() {
        let block = Block::Text("hello".to_string());
        let rendered = render_speak(std::slice::from_ref(&block));
        assert_eq!(
            rendered.len(),
            SPEAK_WRAPPER_OVERHEAD + block.serialized_len() + BLOCK_LINE_OVERHEAD
        );
    }

    #[test]
    fn test_serialize_escapes_reserved_characters() {
        let block = Block::Paragraph {
            children: vec![Block::Text("Ben & Jerry <3".to_string())],
        };
        assert_eq!(block.serialize(), "<p>Ben &amp; Jerry &lt;3</p>");
    }

    #[test]
    fn test_serialize_break_with_time() {
        let block = Block::Break {
            time: Some("800ms".to_string()),
        };
        assert_eq!(block.serialize(), "<break time=\"800ms\"/>");
    }

    #[test]
    fn test_serialize_voice_with_provider() {
        let block = Block::Voice {
            name: "en-US-Neural2-F".to_string(),
            provider: Some("elevenlabs".to_string()),
            children: vec![Block::Text("hi".to_string())],
        };
        assert_eq!(
            block.serialize(),
            "<voice name=\"en-US-Neural2-F\" provider=\"elevenlabs\">hi</voice>"
        );
    }

    #[test]
    fn test_plain_text_flattens_nested_markup() {
        let block = Block::Paragraph {
            children: vec![
                Block::Text("Hello ".to_string()),
                Block::Emphasis {
                    level: Some("strong".to_string()),
                    children: vec![Block::Text("world".to_string())],
                },
                Block::Break {
                    time: Some("1s".to_string()),
                },
                Block::Text("again".to_string()),
            ],
        };
        assert_eq!(block.plain_text(), "Hello world again");
    }
}
