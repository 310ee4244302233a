//! Content-block chunking
//!
//! Groups parsed content blocks into size-bounded chunks while preserving
//! document structure:
//! - Headings start a new chunk and stay with their content
//! - Oversized blocks are split at semantic boundaries
//! - Undersized trailing text is merged into the previous chunk
//! - Section hierarchy follows each chunk for source attribution
//!
//! Character offsets are assigned over the reconstructed document text, so
//! ranges are contiguous and non-overlapping in chunk order.

use chronicler_common::config::ChunkingConfig;
use chronicler_common::models::{ContentBlock, ContentType};
use text_splitter::{ChunkConfig as SplitterConfig, TextSplitter};
use tracing::debug;

/// A chunk produced from content blocks, before ids and embeddings exist
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub text: String,
    pub content_type: ContentType,
    pub page_number: Option<u32>,
    pub section_hierarchy: Vec<String>,
    pub paragraph_index: usize,
    pub char_start: usize,
    pub char_end: usize,
}

struct Accumulator {
    text: String,
    content_type: ContentType,
    page_number: Option<u32>,
    section_hierarchy: Vec<String>,
    paragraph_index: usize,
}

impl Accumulator {
    fn start(block: &ContentBlock, section: &[String]) -> Self {
        Self {
            text: block.text.trim().to_string(),
            content_type: block.content_type,
            page_number: block.page_number,
            section_hierarchy: section.to_vec(),
            paragraph_index: block.position,
        }
    }

    fn append(&mut self, text: &str) {
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.push_str(text);
    }

    fn into_draft(self) -> ChunkDraft {
        ChunkDraft {
            text: self.text,
            content_type: self.content_type,
            page_number: self.page_number,
            section_hierarchy: self.section_hierarchy,
            paragraph_index: self.paragraph_index,
            char_start: 0,
            char_end: 0,
        }
    }
}

/// Split content blocks into chunk drafts
pub fn chunk_blocks(blocks: &[ContentBlock], config: &ChunkingConfig) -> Vec<ChunkDraft> {
    let mut drafts: Vec<ChunkDraft> = Vec::new();
    let mut current: Option<Accumulator> = None;
    let mut section: Vec<String> = Vec::new();

    for block in blocks {
        let text = block.text.trim();
        if text.is_empty() {
            continue;
        }

        // The parser's hierarchy wins; a bare heading starts its own path
        if !block.section_hierarchy.is_empty() {
            section = block.section_hierarchy.clone();
        } else if block.content_type == ContentType::Heading {
            section = vec![text.to_string()];
        }

        if block.content_type == ContentType::Heading {
            flush(&mut drafts, current.take(), config);
            current = Some(Accumulator::start(block, &section));
            continue;
        }

        if text.chars().count() > config.max_chunk_size {
            flush(&mut drafts, current.take(), config);
            split_large_block(&mut drafts, block, text, &section, config);
            continue;
        }

        let fits = current.as_ref().map_or(false, |acc| {
            acc.section_hierarchy == section
                && acc.text.chars().count() + text.chars().count() + 2 <= config.chunk_size
        });
        if fits {
            if let Some(acc) = current.as_mut() {
                acc.append(text);
            }
        } else {
            flush(&mut drafts, current.take(), config);
            current = Some(Accumulator::start(block, &section));
        }
    }

    if let Some(acc) = current {
        let draft = acc.into_draft();
        if !draft.text.is_empty() {
            push_or_merge(&mut drafts, draft, config);
        }
    }

    assign_char_ranges(&mut drafts);

    debug!(
        block_count = blocks.len(),
        chunk_count = drafts.len(),
        "Content blocks chunked"
    );

    drafts
}

fn flush(drafts: &mut Vec<ChunkDraft>, current: Option<Accumulator>, config: &ChunkingConfig) {
    if let Some(acc) = current {
        let draft = acc.into_draft();
        if !draft.text.is_empty() {
            push_or_merge(drafts, draft, config);
        }
    }
}

/// Push a draft, merging undersized text into the previous draft when they
/// belong to the same section
fn push_or_merge(drafts: &mut Vec<ChunkDraft>, draft: ChunkDraft, config: &ChunkingConfig) {
    if draft.text.chars().count() < config.min_chunk_size {
        if let Some(prev) = drafts
            .last_mut()
            .filter(|prev| prev.section_hierarchy == draft.section_hierarchy)
        {
            prev.text.push_str("\n\n");
            prev.text.push_str(&draft.text);
            return;
        }
    }
    drafts.push(draft);
}

fn split_large_block(
    drafts: &mut Vec<ChunkDraft>,
    block: &ContentBlock,
    text: &str,
    section: &[String],
    config: &ChunkingConfig,
) {
    let splitter = TextSplitter::new(SplitterConfig::new(config.chunk_size));
    for piece in splitter.chunks(text) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let draft = ChunkDraft {
            text: piece.to_string(),
            content_type: block.content_type,
            page_number: block.page_number,
            section_hierarchy: section.to_vec(),
            paragraph_index: block.position,
            char_start: 0,
            char_end: 0,
        };
        push_or_merge(drafts, draft, config);
    }
}

/// Assign contiguous character ranges over the reconstructed text, with a
/// two-character paragraph separator between chunks
fn assign_char_ranges(drafts: &mut [ChunkDraft]) {
    let mut cursor = 0usize;
    for draft in drafts.iter_mut() {
        draft.char_start = cursor;
        draft.char_end = cursor + draft.text.chars().count();
        cursor = draft.char_end + 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(text: &str, position: usize) -> ContentBlock {
        ContentBlock {
            text: text.to_string(),
            content_type: ContentType::Paragraph,
            page_number: None,
            section_hierarchy: Vec::new(),
            position,
        }
    }

    fn heading(text: &str, hierarchy: &[&str], position: usize) -> ContentBlock {
        ContentBlock {
            text: text.to_string(),
            content_type: ContentType::Heading,
            page_number: None,
            section_hierarchy: hierarchy.iter().map(|s| s.to_string()).collect(),
            position,
        }
    }

    fn config() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 80,
            min_chunk_size: 10,
            max_chunk_size: 200,
        }
    }

    #[test]
    fn test_empty_blocks() {
        assert!(chunk_blocks(&[], &config()).is_empty());
    }

    #[test]
    fn test_char_ranges_contiguous_and_monotonic() {
        let blocks = vec![
            paragraph("A first paragraph of reasonable length here.", 0),
            paragraph("A second paragraph of reasonable length too.", 1),
            paragraph("And a third one closing the document body.", 2),
        ];
        let drafts = chunk_blocks(&blocks, &config());
        assert!(!drafts.is_empty());

        let mut prev_end = None;
        for draft in &drafts {
            assert!(draft.char_start < draft.char_end);
            assert_eq!(
                draft.char_end - draft.char_start,
                draft.text.chars().count()
            );
            if let Some(end) = prev_end {
                assert_eq!(draft.char_start, end + 2);
            }
            prev_end = Some(draft.char_end);
        }
    }

    #[test]
    fn test_heading_starts_new_chunk_and_sets_section() {
        let blocks = vec![
            heading("Introduction", &["Introduction"], 0),
            paragraph("Opening words about the topic at hand.", 1),
            heading("Rivers", &["Geography", "Rivers"], 2),
            paragraph("Rivers flow from the mountains to the sea.", 3),
        ];
        let drafts = chunk_blocks(&blocks, &config());
        assert_eq!(drafts.len(), 2);

        assert!(drafts[0].text.starts_with("Introduction"));
        assert_eq!(drafts[0].section_hierarchy, vec!["Introduction"]);
        assert_eq!(drafts[1].section_hierarchy, vec!["Geography", "Rivers"]);
        assert!(drafts[1].text.contains("Rivers flow"));
    }

    #[test]
    fn test_small_blocks_merge() {
        let blocks = vec![
            paragraph("Short one.", 0),
            paragraph("Short two.", 1),
            paragraph("Short three.", 2),
        ];
        let drafts = chunk_blocks(&blocks, &config());
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].text.contains("Short one."));
        assert!(drafts[0].text.contains("Short three."));
    }

    #[test]
    fn test_oversized_block_is_split() {
        let long = "A sentence that keeps going. ".repeat(20);
        let blocks = vec![paragraph(long.trim(), 0)];
        let drafts = chunk_blocks(&blocks, &config());
        assert!(drafts.len() > 1);
        for draft in &drafts {
            assert!(draft.text.chars().count() <= config().chunk_size);
        }
    }

    #[test]
    fn test_blocks_inherit_running_section() {
        let blocks = vec![
            heading("Setup", &[], 0),
            paragraph(
                "This paragraph carries no hierarchy of its own but follows the heading.",
                1,
            ),
        ];
        let drafts = chunk_blocks(&blocks, &config());
        assert!(drafts
            .iter()
            .all(|d| d.section_hierarchy == vec!["Setup".to_string()]));
    }

    #[test]
    fn test_tiny_tail_merges_into_previous() {
        let blocks = vec![
            paragraph("A paragraph long enough to stand on its own feet here.", 0),
            paragraph("Tail.", 1),
        ];
        let drafts = chunk_blocks(&blocks, &config());
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].text.ends_with("Tail."));
    }
}
