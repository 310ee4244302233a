//! Document parser seam
//!
//! Format parsing (PDF, DOCX, EPUB, ...) happens outside this system; the
//! core only consumes ordered content blocks. `DocumentParser` is the
//! capability interface an external parser implements, and
//! `PlainTextParser` is the in-tree implementation for plain text, also
//! serving as the deterministic fake in tests.

use chronicler_common::errors::{AppError, Result};
use chronicler_common::models::{ContentBlock, ContentType, DocumentType};
use serde::{Deserialize, Serialize};

/// Raw bytes handed to a parser
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub source_path: String,
    pub document_type: DocumentType,
    pub data: Vec<u8>,
}

/// Result of parsing a document: ordered content blocks plus identity.
///
/// Also the shape the ingest endpoint accepts for documents parsed
/// elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub source_path: String,

    #[serde(default)]
    pub title: Option<String>,

    pub document_type: DocumentType,

    pub blocks: Vec<ContentBlock>,
}

/// Capability interface for format parsers
pub trait DocumentParser: Send + Sync {
    fn parse(&self, source: &DocumentSource) -> Result<ParsedDocument>;
}

/// Parser for plain text: paragraphs split on blank lines
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, source: &DocumentSource) -> Result<ParsedDocument> {
        let text = std::str::from_utf8(&source.data).map_err(|_| AppError::InvalidArgument {
            message: format!("{} is not valid UTF-8", source.source_path),
        })?;

        let blocks = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .enumerate()
            .map(|(position, paragraph)| ContentBlock {
                text: paragraph.to_string(),
                content_type: ContentType::Paragraph,
                page_number: None,
                section_hierarchy: Vec::new(),
                position,
            })
            .collect();

        Ok(ParsedDocument {
            source_path: source.source_path.clone(),
            title: None,
            document_type: DocumentType::Text,
            blocks,
        })
    }
}
