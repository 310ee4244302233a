//! Ingestion pipeline
//!
//! The document write path: fingerprint, chunk, embed, and store. Batch
//! ingestion isolates failures so one bad document never aborts its
//! siblings.

use crate::chunker::{chunk_blocks, ChunkDraft};
use crate::parser::ParsedDocument;
use chronicler_common::config::ChunkingConfig;
use chronicler_common::embeddings::{embed_batch_timed, Embedder};
use chronicler_common::errors::{AppError, Result};
use chronicler_common::metrics;
use chronicler_common::models::{
    ChunkMetadata, Document, DocumentType, SectionRef, StoredChunk,
};
use chronicler_search::{ChunkStore, EmbeddedChunk};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Outcome of ingesting one document
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: Uuid,
    pub source_path: String,
    pub document_type: DocumentType,
    pub chunks_created: usize,
    pub status: String,
    pub errors: Vec<String>,
}

/// Ingestion pipeline over the store/embedder pair
pub struct IngestionPipeline {
    store: Arc<ChunkStore>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    embed_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<ChunkStore>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            chunking,
            embed_timeout,
        }
    }

    /// Ingest one parsed document: chunk, embed, and store atomically
    #[instrument(skip(self, parsed), fields(source_path = %parsed.source_path))]
    pub async fn ingest(&self, parsed: ParsedDocument) -> Result<IngestReport> {
        let start = Instant::now();
        let document_id = Uuid::new_v4();
        let ingested_at = Utc::now();

        let source_hash = fingerprint(&parsed);
        let title = parsed
            .title
            .clone()
            .or_else(|| title_from_path(&parsed.source_path));

        let drafts = chunk_blocks(&parsed.blocks, &self.chunking);
        if drafts.is_empty() {
            return Err(AppError::InvalidArgument {
                message: format!("{} produced no chunkable content", parsed.source_path),
            });
        }

        let texts: Vec<String> = drafts.iter().map(|d| d.text.clone()).collect();
        let embeddings =
            embed_batch_timed(self.embedder.as_ref(), &texts, self.embed_timeout).await?;

        let total_chunks = drafts.len();
        let chunks: Vec<EmbeddedChunk> = drafts
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (draft, embedding))| EmbeddedChunk {
                chunk: StoredChunk {
                    chunk_id: Uuid::new_v4(),
                    text: draft.text.clone(),
                    metadata: ChunkMetadata {
                        document_id,
                        source_path: parsed.source_path.clone(),
                        source_hash: source_hash.clone(),
                        document_title: title.clone(),
                        document_type: parsed.document_type,
                        page_number: draft.page_number,
                        section_hierarchy: draft.section_hierarchy.clone(),
                        paragraph_index: draft.paragraph_index,
                        chunk_index,
                        total_chunks,
                        content_type: draft.content_type,
                        char_start: draft.char_start,
                        char_end: draft.char_end,
                        ingested_at,
                    },
                },
                embedding,
            })
            .collect();

        let document = Document {
            document_id,
            source_path: parsed.source_path.clone(),
            source_hash,
            title,
            document_type: parsed.document_type,
            ingested_at,
            sections: section_refs(&drafts),
            total_chunks,
        };

        self.store.put(document, chunks).await?;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_ingestion(elapsed, total_chunks, parsed.document_type.as_str());

        info!(
            document_id = %document_id,
            chunks_created = total_chunks,
            elapsed_secs = elapsed,
            "Document ingested"
        );

        Ok(IngestReport {
            document_id,
            source_path: parsed.source_path,
            document_type: parsed.document_type,
            chunks_created: total_chunks,
            status: "success".to_string(),
            errors: Vec::new(),
        })
    }

    /// Ingest a batch of documents, reporting each outcome independently
    pub async fn ingest_batch(&self, documents: Vec<ParsedDocument>) -> Vec<IngestReport> {
        let mut reports = Vec::with_capacity(documents.len());

        for parsed in documents {
            let source_path = parsed.source_path.clone();
            let document_type = parsed.document_type;
            match self.ingest(parsed).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(
                        source_path = %source_path,
                        error = %e,
                        "Document ingestion failed"
                    );
                    reports.push(IngestReport {
                        document_id: Uuid::nil(),
                        source_path,
                        document_type,
                        chunks_created: 0,
                        status: "failed".to_string(),
                        errors: vec![e.to_string()],
                    });
                }
            }
        }

        reports
    }
}

/// SHA-256 over the parsed content, for provenance and deduplication
fn fingerprint(parsed: &ParsedDocument) -> String {
    let mut hasher = Sha256::new();
    for block in &parsed.blocks {
        hasher.update(block.text.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

fn title_from_path(source_path: &str) -> Option<String> {
    Path::new(source_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
}

/// Unique section paths in first-appearance order
fn section_refs(drafts: &[ChunkDraft]) -> Vec<SectionRef> {
    let mut seen = std::collections::HashSet::new();
    let mut sections = Vec::new();
    for draft in drafts {
        if draft.section_hierarchy.is_empty() {
            continue;
        }
        let key = draft.section_hierarchy.join("|");
        if seen.insert(key) {
            sections.push(SectionRef {
                hierarchy: draft.section_hierarchy.clone(),
                page_number: draft.page_number,
            });
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicler_common::embeddings::HashEmbedder;
    use chronicler_common::models::{ContentBlock, ContentType};
    use chronicler_search::VectorIndex;

    const DIM: usize = 128;

    fn pipeline() -> (Arc<ChunkStore>, IngestionPipeline) {
        let index = Arc::new(VectorIndex::new(DIM).unwrap());
        let store = Arc::new(ChunkStore::new(index));
        let pipeline = IngestionPipeline::new(
            store.clone(),
            Arc::new(HashEmbedder::new(DIM)),
            ChunkingConfig {
                chunk_size: 120,
                min_chunk_size: 10,
                max_chunk_size: 400,
            },
            Duration::from_secs(5),
        );
        (store, pipeline)
    }

    fn parsed(source_path: &str, paragraphs: &[&str]) -> ParsedDocument {
        ParsedDocument {
            source_path: source_path.to_string(),
            title: None,
            document_type: DocumentType::Text,
            blocks: paragraphs
                .iter()
                .enumerate()
                .map(|(position, text)| ContentBlock {
                    text: text.to_string(),
                    content_type: ContentType::Paragraph,
                    page_number: None,
                    section_hierarchy: Vec::new(),
                    position,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_ingest_stores_document_and_vectors() {
        let (store, pipeline) = pipeline();
        let report = pipeline
            .ingest(parsed(
                "docs/rivers.txt",
                &[
                    "Rivers carry sediment from the mountains down to the sea.",
                    "Deltas form where the current finally slows and spreads out.",
                ],
            ))
            .await
            .unwrap();

        assert_eq!(report.status, "success");
        assert!(report.chunks_created > 0);

        let document = store.get(report.document_id).await.unwrap();
        assert_eq!(document.total_chunks, report.chunks_created);
        assert_eq!(document.title.as_deref(), Some("rivers"));
        assert_eq!(store.index().len(), report.chunks_created);
    }

    #[tokio::test]
    async fn test_ingest_chunk_indices_contiguous() {
        let (store, pipeline) = pipeline();
        let report = pipeline
            .ingest(parsed(
                "docs/long.txt",
                &[
                    "First paragraph with enough words to stand alone as one chunk of text.",
                    "Second paragraph with enough words to stand alone as another chunk here.",
                    "Third paragraph with enough words to stand alone as one more chunk too.",
                ],
            ))
            .await
            .unwrap();

        let page = store
            .get_chunks(report.document_id, 0, 100)
            .await
            .unwrap();
        let indices: Vec<usize> = page.chunks.iter().map(|c| c.metadata.chunk_index).collect();
        assert_eq!(indices, (0..page.total).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_ingest_empty_document_fails() {
        let (_, pipeline) = pipeline();
        let err = pipeline
            .ingest(parsed("docs/empty.txt", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let (store, pipeline) = pipeline();
        let reports = pipeline
            .ingest_batch(vec![
                parsed("docs/good.txt", &["A perfectly reasonable paragraph of text."]),
                parsed("docs/empty.txt", &[]),
                parsed("docs/also-good.txt", &["Another perfectly reasonable paragraph."]),
            ])
            .await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].status, "success");
        assert_eq!(reports[1].status, "failed");
        assert!(!reports[1].errors.is_empty());
        assert_eq!(reports[2].status, "success");

        // The failed sibling did not block the others
        assert_eq!(store.document_count().await, 2);
    }

    #[tokio::test]
    async fn test_ingest_same_content_same_hash() {
        let (store, pipeline) = pipeline();
        let a = pipeline
            .ingest(parsed("docs/a.txt", &["Identical content paragraph."]))
            .await
            .unwrap();
        let b = pipeline
            .ingest(parsed("docs/b.txt", &["Identical content paragraph."]))
            .await
            .unwrap();

        let doc_a = store.get(a.document_id).await.unwrap();
        let doc_b = store.get(b.document_id).await.unwrap();
        assert_eq!(doc_a.source_hash, doc_b.source_hash);
        assert_ne!(doc_a.document_id, doc_b.document_id);
    }
}
