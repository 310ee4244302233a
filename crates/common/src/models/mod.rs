//! Core data models
//!
//! The shared vocabulary of the system: documents, chunks with provenance
//! metadata, search results, and wiki entries with source attribution.
//! Serialized field names and enum spellings are the wire contract and
//! must stay stable across versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Supported document types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Xlsx,
    Markdown,
    Html,
    Epub,
    Text,
    Unknown,
}

impl DocumentType {
    /// Stable wire spelling of this document type
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Xlsx => "xlsx",
            DocumentType::Markdown => "markdown",
            DocumentType::Html => "html",
            DocumentType::Epub => "epub",
            DocumentType::Text => "text",
            DocumentType::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = crate::errors::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(DocumentType::Pdf),
            "docx" => Ok(DocumentType::Docx),
            "xlsx" => Ok(DocumentType::Xlsx),
            "markdown" => Ok(DocumentType::Markdown),
            "html" => Ok(DocumentType::Html),
            "epub" => Ok(DocumentType::Epub),
            "text" => Ok(DocumentType::Text),
            "unknown" => Ok(DocumentType::Unknown),
            other => Err(crate::errors::AppError::InvalidArgument {
                message: format!("unknown document type: {}", other),
            }),
        }
    }
}

/// Types of content blocks extracted from documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Paragraph,
    Heading,
    List,
    Table,
    Code,
    Quote,
    ImageCaption,
    Footnote,
    Unknown,
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::Paragraph
    }
}

/// A single block of content extracted from a document.
///
/// Produced by an external parser; the smallest unit the chunker consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// The extracted text content
    pub text: String,

    /// Type of content block
    #[serde(default)]
    pub content_type: ContentType,

    /// Page number (1-indexed)
    #[serde(default)]
    pub page_number: Option<u32>,

    /// Full section path, outermost heading first
    #[serde(default)]
    pub section_hierarchy: Vec<String>,

    /// Order within the document
    #[serde(default)]
    pub position: usize,
}

/// A section observed in a document, for navigation and topic suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRef {
    /// Section path, outermost heading first
    pub hierarchy: Vec<String>,

    /// Page the section starts on, when known
    pub page_number: Option<u32>,
}

/// Metadata about an ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub document_id: Uuid,

    /// Original file path or URL
    pub source_path: String,

    /// SHA-256 hash of the document content at ingest time
    pub source_hash: String,

    /// Document title if available
    pub title: Option<String>,

    /// Type of document
    pub document_type: DocumentType,

    /// When the document was ingested
    pub ingested_at: DateTime<Utc>,

    /// Sections observed during ingestion, in document order
    pub sections: Vec<SectionRef>,

    /// Total chunks stored for this document
    pub total_chunks: usize,
}

/// Full provenance metadata for a stored chunk.
///
/// Enables precise source attribution for any piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    // Document reference
    pub document_id: Uuid,
    pub source_path: String,
    pub source_hash: String,
    pub document_title: Option<String>,
    pub document_type: DocumentType,

    // Position within document
    pub page_number: Option<u32>,
    pub section_hierarchy: Vec<String>,
    pub paragraph_index: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,

    // Content info
    pub content_type: ContentType,
    pub char_start: usize,
    pub char_end: usize,

    // Timestamps
    pub ingested_at: DateTime<Utc>,
}

impl ChunkMetadata {
    /// Human-readable section label ("Chapter 1 > Overview"), if any
    pub fn section_label(&self) -> Option<String> {
        if self.section_hierarchy.is_empty() {
            None
        } else {
            Some(self.section_hierarchy.join(" > "))
        }
    }
}

/// A chunk as stored in the chunk store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk ID
    pub chunk_id: Uuid,

    /// The chunk text content
    pub text: String,

    /// Full provenance metadata
    pub metadata: ChunkMetadata,
}

/// A single search result with relevance score and source info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// ID of the matched chunk
    pub chunk_id: Uuid,

    /// The matched text content
    pub text: String,

    /// Relevance score (0-1, higher is better)
    pub score: f32,

    /// Source metadata for attribution
    pub metadata: ChunkMetadata,
}

impl SearchResult {
    /// Generate a citation string for this result
    pub fn citation(&self) -> String {
        let mut parts = vec![self
            .metadata
            .document_title
            .clone()
            .unwrap_or_else(|| self.metadata.source_path.clone())];
        if let Some(page) = self.metadata.page_number {
            parts.push(format!("p. {}", page));
        }
        if let Some(section) = self.metadata.section_label() {
            parts.push(section);
        }
        parts.join(", ")
    }
}

/// Search request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Search query text
    pub query: String,

    /// Maximum results to return
    #[serde(default = "default_search_limit")]
    pub limit: usize,

    /// Minimum relevance score
    #[serde(default)]
    pub min_score: f32,

    /// Filter by document IDs
    #[serde(default)]
    pub document_ids: Option<Vec<Uuid>>,

    /// Filter by document types
    #[serde(default)]
    pub document_types: Option<Vec<DocumentType>>,
}

fn default_search_limit() -> usize {
    10
}

/// Search response with results and query info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Original query
    pub query: String,

    pub results: Vec<SearchResult>,

    pub total_results: usize,

    /// Search execution time
    pub search_time_ms: f64,
}

/// A source reference for wiki content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiSource {
    /// Source chunk ID
    pub chunk_id: Uuid,

    /// Source document ID
    pub document_id: Uuid,

    pub document_title: Option<String>,

    pub source_path: String,

    pub page_number: Option<u32>,

    /// Joined section label ("Chapter 1 > Overview")
    pub section: Option<String>,

    pub relevance_score: f32,

    /// Relevant excerpt from the source chunk
    pub excerpt: String,
}

impl WikiSource {
    /// Format source as a footnote-style citation
    pub fn format_citation(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref title) = self.document_title {
            parts.push(format!("\"{}\"", title));
        } else {
            parts.push(self.source_path.clone());
        }

        if let Some(page) = self.page_number {
            parts.push(format!("p. {}", page));
        }

        if let Some(ref section) = self.section {
            parts.push(format!("Section: {}", section));
        }

        parts.join(", ")
    }
}

/// A section of wiki content with sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiSection {
    /// Section heading
    pub heading: String,

    /// Section content
    pub content: String,

    /// Sources supporting this section
    pub sources: Vec<WikiSource>,

    /// Confidence score based on source quality
    pub confidence: f32,

    /// Nested subsections
    pub subsections: Vec<WikiSection>,
}

/// A complete wiki entry with full source attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiEntry {
    pub entry_id: Uuid,

    /// Wiki entry title
    pub title: String,

    /// Brief summary/introduction
    pub summary: String,

    pub sections: Vec<WikiSection>,

    /// Deduplicated list of all sources, in first-appearance order
    pub all_sources: Vec<WikiSource>,

    pub generated_at: DateTime<Utc>,

    /// Original query that generated this entry
    pub query: String,
}

/// Aggregate statistics over the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    pub total_documents: usize,

    pub total_chunks: usize,

    /// Document count per document type
    pub documents_by_type: BTreeMap<String, usize>,

    pub avg_chunks_per_document: f64,
}
