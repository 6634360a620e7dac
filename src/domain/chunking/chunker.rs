use crate::domain::markup::{Block, BLOCK_LINE_OVERHEAD, SPEAK_WRAPPER_OVERHEAD};

/// Reported when a single block, alone in an otherwise empty chunk,
/// would still exceed the budget. The caller is expected to sub-split
/// that block (see `fallback::split_block`) and retry, rather than have
/// the chunker truncate it silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedsFallback {
    pub position: usize,
}

/// Greedily pack sibling blocks into the minimum number of chunks whose
/// serialized `<speak>` form stays within `budget` bytes.
///
/// A single left-to-right pass, not optimal bin-packing: it preserves
/// strict reading order and runs in O(n). A block is never split across
/// chunks. Ties (running size exactly equal to the budget) pack into
/// the current chunk.
pub fn pack(blocks: &[Block], budget: usize) -> Result<Vec<Vec<Block>>, NeedsFallback> {
    let mut chunks: Vec<Vec<Block>> = Vec::new();
    let mut current: Vec<Block> = Vec::new();
    let mut running = SPEAK_WRAPPER_OVERHEAD;

    for (position, block) in blocks.iter().enumerate() {
        let cost = block.serialized_len() + BLOCK_LINE_OVERHEAD;

        if SPEAK_WRAPPER_OVERHEAD + cost > budget {
            // The block alone exceeds the budget; no chunk boundary
            // placement can save it.
            return Err(NeedsFallback { position });
        }

        if running + cost <= budget {
            current.push(block.clone());
            running += cost;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push(block.clone());
            running = SPEAK_WRAPPER_OVERHEAD + cost;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::markup::render_speak;
    use pretty_assertions::assert_eq;

    fn paragraph_of_len(serialized_len: usize) -> Block {
        // "<p>" + text + "</p>" = text + 7 bytes
        Block::Paragraph {
            children: vec![Block::Text("a".repeat(serialized_len - 7))],
        }
    }

    #[test]
    fn test_fitting_input_yields_exactly_one_chunk() {
        let blocks = vec![paragraph_of_len(1000), paragraph_of_len(1500)];
        let chunks = pack(&blocks, 4500).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], blocks);
    }

    #[test]
    fn test_greedy_boundary_placement() {
        // Four paragraphs of 1800 serialized bytes each against a 4500
        // budget: two fit per chunk, the third would overflow.
        let blocks = vec![
            paragraph_of_len(1800),
            paragraph_of_len(1800),
            paragraph_of_len(1800),
            paragraph_of_len(1800),
        ];
        let chunks = pack(&blocks, 4500).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[1].len(), 2);
    }

    #[test]
    fn test_every_chunk_respects_budget() {
        let blocks: Vec<Block> = (0..10).map(|_| paragraph_of_len(1300)).collect();
        let chunks = pack(&blocks, 4500).unwrap();
        for chunk in &chunks {
            assert!(render_speak(chunk).len() <= 4500);
        }
    }

    #[test]
    fn test_order_is_preserved_without_gaps_or_duplicates() {
        let blocks: Vec<Block> = (0..7)
            .map(|i| Block::Paragraph {
                children: vec![Block::Text(format!("paragraph {} {}", i, "x".repeat(1200)))],
            })
            .collect();
        let chunks = pack(&blocks, 4500).unwrap();
        let rejoined: Vec<Block> = chunks.into_iter().flatten().collect();
        assert_eq!(rejoined, blocks);
    }

    #[test]
    fn test_exact_budget_tie_packs_inclusively() {
        // One block whose chunk lands exactly on the budget.
        let block = paragraph_of_len(100);
        let budget = SPEAK_WRAPPER_OVERHEAD + 100 + BLOCK_LINE_OVERHEAD;
        let chunks = pack(std::slice::from_ref(&block), budget).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(render_speak(&chunks[0]).len(), budget);
    }

    #[test]
    fn test_oversized_block_reports_fallback_position() {
        let blocks = vec![
            paragraph_of_len(1000),
            paragraph_of_len(6000),
            paragraph_of_len(1000),
        ];
        let err = pack(&blocks, 4500).unwrap_err();
        assert_eq!(err, NeedsFallback { position: 1 });
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunks = pack(&[], 4500).unwrap();
        assert!(chunks.is_empty());
    }
}
