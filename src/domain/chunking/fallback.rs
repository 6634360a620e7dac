use super::error::ChunkingError;
use crate::domain::markup::{Block, BLOCK_LINE_OVERHEAD, SPEAK_WRAPPER_OVERHEAD};
use regex::Regex;

/// Wrapper bytes added by `wrap_raw`: `<speak>\n` plus `\n</speak>`.
const RAW_WRAPPER_OVERHEAD: usize = 17;

/// Split an oversized atomic block into the minimum number of sub-blocks
/// that each fit the budget, preserving text order and the block's own
/// tag and attributes on every piece. The inner markup is flattened to
/// its spoken text; sentence boundaries are preferred split points, with
/// a byte-aware character split as the last resort.
pub fn split_block(block: &Block, budget: usize) -> Result<Vec<Block>, ChunkingError> {
    let max_block_len = budget.saturating_sub(SPEAK_WRAPPER_OVERHEAD + BLOCK_LINE_OVERHEAD);
    let tag_overhead = rebuild(block, String::new())?.serialized_len();
    if max_block_len <= tag_overhead {
        return Err(ChunkingError::BudgetTooSmall { budget });
    }
    // Escaped text bytes allowed inside each rebuilt block.
    let max_text = max_block_len - tag_overhead;

    let text = block.plain_text();
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(&text) {
        let sentence_len: usize = sentence.chars().map(escaped_len).sum();

        if sentence_len > max_text {
            // A single sentence over budget: fall back to splitting at
            // character level, still counting escaped bytes.
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let mut piece = String::new();
            let mut piece_len = 0usize;
            for c in sentence.chars() {
                let char_len = escaped_len(c);
                if piece_len + char_len > max_text {
                    pieces.push(std::mem::take(&mut piece));
                    piece_len = 0;
                }
                piece.push(c);
                piece_len += char_len;
            }
            if !piece.is_empty() {
                pieces.push(piece);
            }
        } else if current_len + sentence_len > max_text && !current.is_empty() {
            pieces.push(std::mem::replace(&mut current, sentence));
            current_len = sentence_len;
        } else {
            current.push_str(&sentence);
            current_len += sentence_len;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces.into_iter().map(|piece| rebuild(block, piece)).collect()
}

/// Markup-agnostic splitting of raw input the parser rejected even after
/// the repair pass. Boundary preference: pause directives, then
/// paragraph ends, then sentences. Every emitted chunk is re-wrapped in
/// a minimal `<speak>` root and must itself be well-formed, otherwise
/// the whole split is refused.
pub fn split_raw(raw: &str, budget: usize) -> Result<Vec<String>, ChunkingError> {
    let inner = strip_speak_wrapper(raw);
    let sentence_boundary = Regex::new(r"[.!?]+\s+").unwrap();

    let mut parts: Vec<String> = Vec::new();
    for part in split_at_boundaries(inner) {
        if RAW_WRAPPER_OVERHEAD + part.len() > budget {
            // Degrade one more level for this part only.
            for sentence in split_with_pattern(&part, &sentence_boundary) {
                if RAW_WRAPPER_OVERHEAD + sentence.len() > budget {
                    // Splitting inside markup at character level cannot
                    // be kept well-formed; refuse instead of guessing.
                    return Err(ChunkingError::HeuristicFailed);
                }
                parts.push(sentence);
            }
        } else {
            parts.push(part);
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for part in parts {
        if part.trim().is_empty() {
            continue;
        }
        if current.is_empty() {
            current = part;
        } else if RAW_WRAPPER_OVERHEAD + current.len() + part.len() > budget {
            chunks.push(wrap_raw(&current));
            current = part;
        } else {
            current.push_str(&part);
        }
    }
    if !current.trim().is_empty() {
        chunks.push(wrap_raw(&current));
    }

    for chunk in &chunks {
        if roxmltree::Document::parse(chunk).is_err() {
            return Err(ChunkingError::HeuristicFailed);
        }
    }

    Ok(chunks)
}

/// Split text at sentence-ending punctuation, keeping the punctuation
/// and trailing whitespace with the preceding sentence so concatenating
/// the pieces reproduces the input exactly.
pub fn split_sentences(text: &str) -> Vec<String> {
    let pattern = Regex::new(r"[.!?]+\s+").unwrap();
    split_with_pattern(text, &pattern)
}

fn split_with_pattern(text: &str, boundary: &Regex) -> Vec<String> {
    let mut parts = Vec::new();
    let mut last_end = 0;
    for mat in boundary.find_iter(text) {
        parts.push(text[last_end..mat.end()].to_string());
        last_end = mat.end();
    }
    if last_end < text.len() {
        parts.push(text[last_end..].to_string());
    }
    parts
}

fn split_at_boundaries(inner: &str) -> Vec<String> {
    if inner.contains("<break") {
        let pause = Regex::new(r"<break[^>]*/>\s*").unwrap();
        split_with_pattern(inner, &pause)
    } else if inner.contains("</p>") {
        let paragraph_end = Regex::new(r"</p>\s*").unwrap();
        split_with_pattern(inner, &paragraph_end)
    } else {
        split_sentences(inner)
    }
}

fn strip_speak_wrapper(raw: &str) -> &str {
    let mut s = raw.trim();
    if s.starts_with("<?xml") {
        if let Some(end) = s.find("?>") {
            s = s[end + 2..].trim_start();
        }
    }
    if s.starts_with("<speak") {
        if let Some(end) = s.find('>') {
            s = &s[end + 1..];
        }
    }
    if let Some(stripped) = s.strip_suffix("</speak>") {
        s = stripped;
    }
    s.trim()
}

fn wrap_raw(content: &str) -> String {
    format!("<speak>\n{}\n</speak>", content.trim_end())
}

/// Serialized size of one character after XML escaping.
fn escaped_len(c: char) -> usize {
    match c {
        '&' => 5,
        '<' | '>' => 4,
        _ => c.len_utf8(),
    }
}

fn rebuild(template: &Block, text: String) -> Result<Block, ChunkingError> {
    match template {
        Block::Paragraph { .. } => Ok(Block::Paragraph {
            children: vec![Block::Text(text)],
        }),
        Block::Sentence { .. } => Ok(Block::Sentence {
            children: vec![Block::Text(text)],
        }),
        Block::Emphasis { level, .. } => Ok(Block::Emphasis {
            level: level.clone(),
            children: vec![Block::Text(text)],
        }),
        Block::Text(_) => Ok(Block::Text(text)),
        Block::Break { .. } => Err(ChunkingError::Unsplittable { kind: "break" }),
        Block::Voice { .. } => Err(ChunkingError::Unsplittable { kind: "voice" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_block_preserves_text_and_fits_budget() {
        let sentence = "This is one complete narration sentence. ";
        let block = Block::Paragraph {
            children: vec![Block::Text(sentence.repeat(150))],
        };
        assert!(block.serialized_len() > 4500);

        let pieces = split_block(&block, 4500).unwrap();
        assert!(pieces.len() >= 2);

        let mut rejoined = String::new();
        for piece in &pieces {
            assert!(
                piece.serialized_len() + SPEAK_WRAPPER_OVERHEAD + BLOCK_LINE_OVERHEAD <= 4500,
                "piece of {} bytes exceeds budget",
                piece.serialized_len()
            );
            assert!(matches!(piece, Block::Paragraph { .. }));
            rejoined.push_str(&piece.plain_text());
        }
        assert_eq!(rejoined, block.plain_text());
    }

    #[test]
    fn test_split_block_keeps_emphasis_attributes() {
        let block = Block::Emphasis {
            level: Some("strong".to_string()),
            children: vec![Block::Text("Loud words. ".repeat(500))],
        };
        let pieces = split_block(&block, 2000).unwrap();
        for piece in &pieces {
            match piece {
                Block::Emphasis { level, .. } => {
                    assert_eq!(level.as_deref(), Some("strong"))
                }
                other => panic!("expected emphasis piece, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_split_block_handles_text_without_punctuation() {
        let block = Block::Text("a".repeat(10_000));
        let pieces = split_block(&block, 4500).unwrap();
        assert!(pieces.len() >= 3);
        let rejoined: String = pieces.iter().map(Block::plain_text).collect();
        assert_eq!(rejoined.len(), 10_000);
    }

    #[test]
    fn test_split_block_refuses_break() {
        let block = Block::Break {
            time: Some("1s".to_string()),
        };
        assert!(matches!(
            split_block(&block, 4500),
            Err(ChunkingError::Unsplittable { kind: "break" })
        ));
    }

    #[test]
    fn test_split_block_counts_escaped_bytes() {
        // Every '&' serializes to five bytes; a naive char count would
        // overshoot the budget.
        let block = Block::Paragraph {
            children: vec![Block::Text("&&&&&&&&&& ".repeat(200))],
        };
        let pieces = split_block(&block, 1000).unwrap();
        for piece in &pieces {
            assert!(piece.serialized_len() + SPEAK_WRAPPER_OVERHEAD + BLOCK_LINE_OVERHEAD <= 1000);
        }
    }

    #[test]
    fn test_split_raw_prefers_pause_boundaries() {
        let body = format!(
            "{}<break time=\"1s\"/>{}",
            "First half. ".repeat(200),
            "Second half. ".repeat(200)
        );
        let raw = format!("<speak>{}</speak>", body);
        let chunks = split_raw(&raw, 4500).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 4500);
            assert!(roxmltree::Document::parse(chunk).is_ok());
        }
    }

    #[test]
    fn test_split_raw_falls_back_to_paragraph_boundaries() {
        let raw = format!(
            "<speak><p>{}</p><p>{}</p></speak>",
            "One. ".repeat(500),
            "Two. ".repeat(500)
        );
        let chunks = split_raw(&raw, 4500).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 4500);
        }
    }

    #[test]
    fn test_split_raw_sentences_as_last_resort() {
        let raw = "Sentence one. Sentence two. Sentence three. ".repeat(150);
        let chunks = split_raw(&raw, 4500).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 4500);
            assert!(chunk.starts_with("<speak>"));
        }
    }

    #[test]
    fn test_split_raw_refuses_unsplittable_markup() {
        // One giant run with markup but no usable boundary inside: the
        // sentence-level degrade cannot keep it well-formed.
        let raw = format!("<speak><p>{}</p></speak>", "word ".repeat(2000));
        assert!(matches!(
            split_raw(&raw, 4500),
            Err(ChunkingError::HeuristicFailed)
        ));
    }

    #[test]
    fn test_split_sentences_round_trips() {
        let text = "One. Two! Three? Four";
        let parts = split_sentences(text);
        assert_eq!(parts.concat(), text);
        assert_eq!(parts.len(), 4);
    }
}
