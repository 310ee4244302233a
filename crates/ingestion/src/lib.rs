//! Chronicler Ingestion
//!
//! The write path: turns parsed content blocks into stored, embedded chunks.
//! - `DocumentParser`: capability seam for external format parsers
//! - `chunker`: groups content blocks into size-bounded chunks with
//!   provenance metadata
//! - `IngestionPipeline`: hash, chunk, embed, and store documents with
//!   per-document failure isolation

pub mod chunker;
pub mod parser;
pub mod pipeline;

pub use chunker::{chunk_blocks, ChunkDraft};
pub use parser::{DocumentParser, DocumentSource, ParsedDocument, PlainTextParser};
pub use pipeline::{IngestReport, IngestionPipeline};
