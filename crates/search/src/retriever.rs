//! Query orchestration
//!
//! Joins the vector index with the chunk store to answer queries: ranked
//! semantic search with filtering, similar-chunk lookup from a stored
//! vector, and context-window expansion around a matched chunk.

use crate::store::ChunkStore;
use crate::vector::{SearchFilter, VectorIndex};
use chronicler_common::errors::{AppError, Result};
use chronicler_common::models::{DocumentType, SearchResult, StoredChunk};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Extra candidates requested beyond the caller's limit, absorbing
/// post-filter and dangling-vector loss
const OVERFETCH_SLACK: usize = 16;

/// Per-call retrieval options, passed explicitly rather than held as state
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub limit: usize,
    pub min_score: f32,
    pub document_ids: Option<Vec<Uuid>>,
    pub document_types: Option<Vec<DocumentType>>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.0,
            document_ids: None,
            document_types: None,
        }
    }
}

/// A chunk returned as part of a context window
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub chunk: StoredChunk,
    pub is_target: bool,
}

/// The chunks surrounding a matched chunk within its document
#[derive(Debug, Clone, Serialize)]
pub struct ChunkContext {
    pub document_id: Uuid,
    pub document_title: Option<String>,
    pub chunks: Vec<ContextChunk>,
}

/// Retrieval front-end over the store/index pair
pub struct Retriever {
    store: Arc<ChunkStore>,
    index: Arc<VectorIndex>,
    overfetch_factor: usize,
}

impl Retriever {
    pub fn new(store: Arc<ChunkStore>, overfetch_factor: usize) -> Self {
        let index = store.index().clone();
        Self {
            store,
            index,
            overfetch_factor: overfetch_factor.max(1),
        }
    }

    /// Ranked semantic search for a query embedding.
    ///
    /// The index is asked for more candidates than the caller's limit so
    /// that filtering losses do not shrink the result page; results whose
    /// chunk lookup fails (a delete won the race) are silently excluded.
    pub async fn search(
        &self,
        query_vector: &[f32],
        options: &RetrievalOptions,
    ) -> Result<Vec<SearchResult>> {
        if options.limit == 0 {
            return Ok(Vec::new());
        }

        let k = options
            .limit
            .saturating_mul(self.overfetch_factor)
            .max(options.limit + OVERFETCH_SLACK);

        let filter = SearchFilter::new(
            options.document_ids.as_deref(),
            options.document_types.as_deref(),
        );

        let scored = self
            .index
            .search(query_vector, k, options.min_score, &filter)?;

        let mut results = Vec::with_capacity(options.limit.min(scored.len()));
        for candidate in scored {
            match self.store.get_chunk(candidate.chunk_id).await {
                Ok(chunk) => {
                    results.push(SearchResult {
                        chunk_id: chunk.chunk_id,
                        text: chunk.text,
                        score: candidate.score,
                        metadata: chunk.metadata,
                    });
                    if results.len() == options.limit {
                        break;
                    }
                }
                Err(AppError::ChunkNotFound { .. }) => {
                    tracing::debug!(chunk_id = %candidate.chunk_id, "Skipping dangling vector");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    /// Find chunks similar to an existing chunk.
    ///
    /// Reuses the chunk's stored vector rather than re-embedding its text,
    /// and never includes the chunk itself in the results.
    pub async fn similar(&self, chunk_id: Uuid, limit: usize) -> Result<Vec<SearchResult>> {
        // Resolve the chunk first so an unknown id reports NotFound
        self.store.get_chunk(chunk_id).await?;

        let vector = self
            .index
            .get_vector(chunk_id)
            .ok_or_else(|| AppError::ChunkNotFound {
                id: chunk_id.to_string(),
            })?;

        let k = (limit + 1)
            .saturating_mul(self.overfetch_factor)
            .max(limit + 1 + OVERFETCH_SLACK);

        let scored = self
            .index
            .search(&vector, k, 0.0, &SearchFilter::default())?;

        let mut results = Vec::with_capacity(limit.min(scored.len()));
        for candidate in scored {
            if candidate.chunk_id == chunk_id {
                continue;
            }
            match self.store.get_chunk(candidate.chunk_id).await {
                Ok(chunk) => {
                    results.push(SearchResult {
                        chunk_id: chunk.chunk_id,
                        text: chunk.text,
                        score: candidate.score,
                        metadata: chunk.metadata,
                    });
                    if results.len() == limit {
                        break;
                    }
                }
                Err(AppError::ChunkNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    /// Expand a context window around a chunk within its document.
    ///
    /// Returns the inclusive chunk_index range `[index-window, index+window]`
    /// clipped to the document, with the original chunk flagged. Reads only
    /// the chunks in the window.
    pub async fn context(&self, chunk_id: Uuid, window: usize) -> Result<ChunkContext> {
        let (document_id, target_index) = self
            .store
            .locate_chunk(chunk_id)
            .await
            .ok_or_else(|| AppError::ChunkNotFound {
                id: chunk_id.to_string(),
            })?;

        let start = target_index.saturating_sub(window);
        let end = target_index + window + 1;
        let (chunks, document) = self.store.get_range(document_id, start, end).await?;

        Ok(ChunkContext {
            document_id,
            document_title: document.title,
            chunks: chunks
                .into_iter()
                .map(|chunk| {
                    let is_target = chunk.metadata.chunk_index == target_index;
                    ContextChunk { chunk, is_target }
                })
                .collect(),
        })
    }
}
