//! Chunk store
//!
//! Holds every ingested document and its ordered chunks, and coordinates the
//! paired vector-index mutations so callers get read-after-write consistency
//! per document. Writers serialize on a per-document mutex; readers only
//! take shared locks, so queries touching other documents never wait on an
//! ingest.

use crate::vector::{VectorAttributes, VectorIndex};
use chronicler_common::errors::{AppError, Result};
use chronicler_common::models::{Document, KnowledgeBaseStats, StoredChunk};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

/// A chunk together with its embedding, ready for storage
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: StoredChunk,
    pub embedding: Vec<f32>,
}

/// One page of a document's chunks, in chunk_index order
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPage {
    pub chunks: Vec<StoredChunk>,
    pub total: usize,
}

/// Full document text rebuilt from its chunks
#[derive(Debug, Clone, Serialize)]
pub struct ReconstructedText {
    pub document_id: Uuid,
    pub document_title: Option<String>,
    pub text: String,
    pub word_count: usize,
    pub chunk_count: usize,
}

struct DocumentRecord {
    document: Document,
    chunks: Vec<StoredChunk>,
}

#[derive(Debug, Clone, Copy)]
struct ChunkLocation {
    document_id: Uuid,
    chunk_index: usize,
}

/// Store of documents and their chunks.
///
/// Owns the write path for the paired chunk/vector state: `put` and `delete`
/// mutate both sides inside one per-document critical section.
pub struct ChunkStore {
    index: Arc<VectorIndex>,
    documents: RwLock<HashMap<Uuid, Arc<DocumentRecord>>>,
    chunk_locations: RwLock<HashMap<Uuid, ChunkLocation>>,
    write_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ChunkStore {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            documents: RwLock::new(HashMap::new()),
            chunk_locations: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The vector index paired with this store
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Atomically replace all chunks of a document.
    ///
    /// Validates the chunk invariants, then publishes vectors and chunks
    /// under the document's write lock. Either every chunk and vector lands
    /// or none do.
    pub async fn put(&self, document: Document, chunks: Vec<EmbeddedChunk>) -> Result<usize> {
        self.validate_put(&document, &chunks)?;

        let document_id = document.document_id;
        let _guard = self.document_write_lock(document_id).await;

        let old_chunk_ids: Vec<Uuid> = {
            let documents = self.documents.read().await;
            documents
                .get(&document_id)
                .map(|record| record.chunks.iter().map(|c| c.chunk_id).collect())
                .unwrap_or_default()
        };

        // Vectors go in first; a vector without a registered chunk is
        // invisible to readers, the reverse would not be.
        let attrs = VectorAttributes {
            document_id,
            document_type: document.document_type,
        };
        for embedded in &chunks {
            self.index
                .upsert(embedded.chunk.chunk_id, embedded.embedding.clone(), attrs)?;
        }

        let stored: Vec<StoredChunk> = chunks.into_iter().map(|e| e.chunk).collect();
        let new_ids: Vec<Uuid> = stored.iter().map(|c| c.chunk_id).collect();
        let chunk_count = stored.len();

        {
            let mut documents = self.documents.write().await;
            let mut locations = self.chunk_locations.write().await;
            for old_id in &old_chunk_ids {
                locations.remove(old_id);
            }
            for (i, id) in new_ids.iter().enumerate() {
                locations.insert(
                    *id,
                    ChunkLocation {
                        document_id,
                        chunk_index: i,
                    },
                );
            }
            documents.insert(
                document_id,
                Arc::new(DocumentRecord {
                    document,
                    chunks: stored,
                }),
            );
        }

        for old_id in old_chunk_ids {
            if !new_ids.contains(&old_id) {
                self.index.delete(old_id);
            }
        }

        tracing::info!(
            document_id = %document_id,
            chunk_count,
            "Document stored"
        );

        Ok(chunk_count)
    }

    /// Delete a document, its chunks, and their vectors.
    ///
    /// Returns the number of chunks removed. A vector observed by a
    /// concurrent search after the chunks are gone resolves to not-found
    /// and is excluded from results, so no dangling data surfaces.
    pub async fn delete(&self, document_id: Uuid) -> Result<usize> {
        let _guard = self.document_write_lock(document_id).await;

        let record = {
            let mut documents = self.documents.write().await;
            let record = documents
                .remove(&document_id)
                .ok_or_else(|| AppError::DocumentNotFound {
                    id: document_id.to_string(),
                })?;
            let mut locations = self.chunk_locations.write().await;
            for chunk in &record.chunks {
                locations.remove(&chunk.chunk_id);
            }
            record
        };

        for chunk in &record.chunks {
            self.index.delete(chunk.chunk_id);
        }

        self.write_locks.lock().await.remove(&document_id);

        tracing::info!(
            document_id = %document_id,
            chunks_deleted = record.chunks.len(),
            "Document deleted"
        );

        Ok(record.chunks.len())
    }

    /// Get a document's metadata
    pub async fn get(&self, document_id: Uuid) -> Result<Document> {
        let documents = self.documents.read().await;
        documents
            .get(&document_id)
            .map(|record| record.document.clone())
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })
    }

    /// List documents, ordered by ingestion time
    pub async fn list(&self, offset: usize, limit: usize) -> (Vec<Document>, usize) {
        let documents = self.documents.read().await;
        let mut all: Vec<Document> = documents
            .values()
            .map(|record| record.document.clone())
            .collect();
        all.sort_by(|a, b| {
            a.ingested_at
                .cmp(&b.ingested_at)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        let total = all.len();
        (all.into_iter().skip(offset).take(limit).collect(), total)
    }

    /// Get one page of a document's chunks in chunk_index order
    pub async fn get_chunks(
        &self,
        document_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<ChunkPage> {
        let documents = self.documents.read().await;
        let record = documents
            .get(&document_id)
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })?;
        let total = record.chunks.len();
        let chunks = record
            .chunks
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(ChunkPage { chunks, total })
    }

    /// Look up a single chunk by id
    pub async fn get_chunk(&self, chunk_id: Uuid) -> Result<StoredChunk> {
        let location = self.locate(chunk_id).await.ok_or_else(|| {
            AppError::ChunkNotFound {
                id: chunk_id.to_string(),
            }
        })?;
        let documents = self.documents.read().await;
        documents
            .get(&location.document_id)
            .and_then(|record| record.chunks.get(location.chunk_index))
            .cloned()
            .ok_or_else(|| AppError::ChunkNotFound {
                id: chunk_id.to_string(),
            })
    }

    /// Resolve a chunk id to its document and position, if present
    pub async fn locate_chunk(&self, chunk_id: Uuid) -> Option<(Uuid, usize)> {
        self.locate(chunk_id)
            .await
            .map(|loc| (loc.document_id, loc.chunk_index))
    }

    /// Fetch a contiguous chunk_index range of a document's chunks.
    ///
    /// The range is clipped to the document; cost is proportional to the
    /// range length, not the document size.
    pub async fn get_range(
        &self,
        document_id: Uuid,
        start: usize,
        end: usize,
    ) -> Result<(Vec<StoredChunk>, Document)> {
        let documents = self.documents.read().await;
        let record = documents
            .get(&document_id)
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })?;
        let end = end.min(record.chunks.len());
        let start = start.min(end);
        Ok((record.chunks[start..end].to_vec(), record.document.clone()))
    }

    /// Rebuild the full document text from its chunks.
    ///
    /// Character-range gaps between adjacent chunks choose the separator:
    /// a gap of two or more becomes a paragraph break, a gap of one a
    /// space, and touching ranges concatenate directly.
    pub async fn reconstruct_text(&self, document_id: Uuid) -> Result<ReconstructedText> {
        let documents = self.documents.read().await;
        let record = documents
            .get(&document_id)
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })?;

        let mut text = String::new();
        let mut prev_end: Option<usize> = None;
        for chunk in &record.chunks {
            if let Some(end) = prev_end {
                let gap = chunk.metadata.char_start.saturating_sub(end);
                if gap >= 2 {
                    text.push_str("\n\n");
                } else if gap == 1 {
                    text.push(' ');
                }
            }
            text.push_str(&chunk.text);
            prev_end = Some(chunk.metadata.char_end);
        }

        let word_count = text.split_whitespace().count();

        Ok(ReconstructedText {
            document_id,
            document_title: record.document.title.clone(),
            text,
            word_count,
            chunk_count: record.chunks.len(),
        })
    }

    /// Aggregate statistics over all stored documents
    pub async fn stats(&self) -> KnowledgeBaseStats {
        let documents = self.documents.read().await;
        let total_documents = documents.len();
        let mut total_chunks = 0usize;
        let mut documents_by_type: BTreeMap<String, usize> = BTreeMap::new();

        for record in documents.values() {
            total_chunks += record.chunks.len();
            *documents_by_type
                .entry(record.document.document_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let avg_chunks_per_document = if total_documents > 0 {
            total_chunks as f64 / total_documents as f64
        } else {
            0.0
        };

        KnowledgeBaseStats {
            total_documents,
            total_chunks,
            documents_by_type,
            avg_chunks_per_document,
        }
    }

    /// Number of stored documents
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    async fn locate(&self, chunk_id: Uuid) -> Option<ChunkLocation> {
        self.chunk_locations.read().await.get(&chunk_id).copied()
    }

    async fn document_write_lock(&self, document_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.write_locks.lock().await;
            locks
                .entry(document_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    fn validate_put(&self, document: &Document, chunks: &[EmbeddedChunk]) -> Result<()> {
        if document.total_chunks != chunks.len() {
            return Err(AppError::InvalidArgument {
                message: format!(
                    "document.total_chunks {} does not match chunk count {}",
                    document.total_chunks,
                    chunks.len()
                ),
            });
        }

        let mut prev_end: Option<usize> = None;
        for (i, embedded) in chunks.iter().enumerate() {
            let meta = &embedded.chunk.metadata;
            if meta.document_id != document.document_id {
                return Err(AppError::InvalidArgument {
                    message: format!("chunk {} belongs to a different document", i),
                });
            }
            if meta.chunk_index != i {
                return Err(AppError::InvalidArgument {
                    message: format!("chunk_index {} at position {} breaks contiguity", meta.chunk_index, i),
                });
            }
            if meta.total_chunks != chunks.len() {
                return Err(AppError::InvalidArgument {
                    message: format!("chunk {} carries stale total_chunks", i),
                });
            }
            if meta.char_start >= meta.char_end {
                return Err(AppError::InvalidArgument {
                    message: format!("chunk {} has an empty or inverted char range", i),
                });
            }
            if let Some(end) = prev_end {
                if meta.char_start < end {
                    return Err(AppError::InvalidArgument {
                        message: format!("chunk {} overlaps the previous chunk's char range", i),
                    });
                }
            }
            prev_end = Some(meta.char_end);

            if embedded.embedding.len() != self.index.dimension() {
                return Err(AppError::DimensionMismatch {
                    expected: self.index.dimension(),
                    actual: embedded.embedding.len(),
                });
            }
        }

        Ok(())
    }
}
