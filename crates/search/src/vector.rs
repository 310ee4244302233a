//! Exact vector similarity index
//!
//! A flat in-memory index over chunk embeddings. Search scans every stored
//! vector, so results are exact (recall 1.0) at every corpus size this
//! system targets; see [`EXACT_SCAN_ADVISORY_LIMIT`]. Scores are cosine
//! similarity clamped to [0, 1], and ties are broken by vector insertion
//! order so result ordering is fully deterministic.

use chronicler_common::errors::{AppError, Result};
use chronicler_common::models::DocumentType;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use uuid::Uuid;

/// Above this vector count a scan-based index stops being the right
/// structure and an ANN index should replace it. Everything below is served
/// exactly.
pub const EXACT_SCAN_ADVISORY_LIMIT: usize = 250_000;

/// Filterable attributes stored alongside each vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorAttributes {
    pub document_id: Uuid,
    pub document_type: DocumentType,
}

/// Per-request filter, evaluated before the top-k cut.
///
/// A candidate excluded by the filter never occupies a result slot.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub document_ids: Option<HashSet<Uuid>>,
    pub document_types: Option<HashSet<DocumentType>>,
}

impl SearchFilter {
    /// Build a filter from optional id/type lists
    pub fn new(
        document_ids: Option<&[Uuid]>,
        document_types: Option<&[DocumentType]>,
    ) -> Self {
        Self {
            document_ids: document_ids.map(|ids| ids.iter().copied().collect()),
            document_types: document_types.map(|types| types.iter().copied().collect()),
        }
    }

    fn matches(&self, attrs: &VectorAttributes) -> bool {
        if let Some(ref ids) = self.document_ids {
            if !ids.contains(&attrs.document_id) {
                return false;
            }
        }
        if let Some(ref types) = self.document_types {
            if !types.contains(&attrs.document_type) {
                return false;
            }
        }
        true
    }
}

/// A scored candidate returned from the index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredChunk {
    pub chunk_id: Uuid,
    pub score: f32,
}

struct VectorEntry {
    /// L2-normalized embedding
    vector: Vec<f32>,
    attrs: VectorAttributes,
    /// Insertion sequence, the deterministic tie-breaker
    seq: u64,
}

struct IndexInner {
    entries: HashMap<Uuid, VectorEntry>,
    next_seq: u64,
}

/// Exact similarity index over chunk embeddings.
///
/// Dimensionality is fixed at creation; vectors of any other length are
/// rejected.
pub struct VectorIndex {
    dimension: usize,
    inner: RwLock<IndexInner>,
}

impl VectorIndex {
    /// Create an index for vectors of the given dimensionality
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(AppError::InvalidArgument {
                message: "vector dimension must be non-zero".to_string(),
            });
        }
        Ok(Self {
            dimension,
            inner: RwLock::new(IndexInner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
        })
    }

    /// The fixed vector dimensionality of this index
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace the vector for a chunk.
    ///
    /// A replaced vector keeps its original insertion sequence so repeated
    /// upserts do not reshuffle tie-breaking.
    pub fn upsert(
        &self,
        chunk_id: Uuid,
        vector: Vec<f32>,
        attrs: VectorAttributes,
    ) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let vector = normalize(vector);

        let mut inner = self.write();
        let seq = match inner.entries.get(&chunk_id) {
            Some(existing) => existing.seq,
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                seq
            }
        };
        inner.entries.insert(chunk_id, VectorEntry { vector, attrs, seq });
        Ok(())
    }

    /// Rank the k best-matching chunks for a query vector.
    ///
    /// The filter is applied to every candidate before ranking, results are
    /// sorted by score descending with insertion order breaking ties, and
    /// candidates below `min_score` are dropped.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        min_score: f32,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(query.to_vec());

        let inner = self.read();
        let mut candidates: Vec<(f32, u64, Uuid)> = inner
            .entries
            .iter()
            .filter(|(_, entry)| filter.matches(&entry.attrs))
            .filter_map(|(id, entry)| {
                let score = dot(&query, &entry.vector).max(0.0);
                if score < min_score {
                    None
                } else {
                    Some((score, entry.seq, *id))
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        candidates.truncate(k);

        Ok(candidates
            .into_iter()
            .map(|(score, _, chunk_id)| ScoredChunk { chunk_id, score })
            .collect())
    }

    /// Get the stored (normalized) vector for a chunk
    pub fn get_vector(&self, chunk_id: Uuid) -> Option<Vec<f32>> {
        self.read().entries.get(&chunk_id).map(|e| e.vector.clone())
    }

    /// Remove a vector. Removing an unknown id is a no-op.
    pub fn delete(&self, chunk_id: Uuid) -> bool {
        self.write().entries.remove(&chunk_id).is_some()
    }

    /// Remove every vector belonging to a document, returning the count
    pub fn remove_document(&self, document_id: Uuid) -> usize {
        let mut inner = self.write();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| entry.attrs.document_id != document_id);
        before - inner.entries.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexInner> {
        self.inner.read().expect("vector index lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexInner> {
        self.inner.write().expect("vector index lock poisoned")
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(document_id: Uuid, document_type: DocumentType) -> VectorAttributes {
        VectorAttributes {
            document_id,
            document_type,
        }
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = VectorIndex::new(3).unwrap();
        let err = index
            .upsert(
                Uuid::new_v4(),
                vec![1.0, 0.0],
                attrs(Uuid::new_v4(), DocumentType::Text),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { expected: 3, actual: 2 }));

        let err = index
            .search(&[1.0], 5, 0.0, &SearchFilter::default())
            .unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_search_descending_order() {
        let index = VectorIndex::new(2).unwrap();
        let doc = Uuid::new_v4();
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        let mid = Uuid::new_v4();

        index.upsert(far, vec![0.0, 1.0], attrs(doc, DocumentType::Text)).unwrap();
        index.upsert(near, vec![1.0, 0.0], attrs(doc, DocumentType::Text)).unwrap();
        index.upsert(mid, vec![1.0, 1.0], attrs(doc, DocumentType::Text)).unwrap();

        let results = index
            .search(&[1.0, 0.0], 10, 0.0, &SearchFilter::default())
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk_id, near);
        assert_eq!(results[1].chunk_id, mid);
        assert_eq!(results[2].chunk_id, far);
        assert!(results[0].score > results[1].score);
        assert!(results[1].score > results[2].score);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let index = VectorIndex::new(2).unwrap();
        let doc = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        index.upsert(first, vec![1.0, 0.0], attrs(doc, DocumentType::Text)).unwrap();
        index.upsert(second, vec![2.0, 0.0], attrs(doc, DocumentType::Text)).unwrap();

        let results = index
            .search(&[1.0, 0.0], 10, 0.0, &SearchFilter::default())
            .unwrap();
        assert_eq!(results[0].chunk_id, first);
        assert_eq!(results[1].chunk_id, second);

        // Re-upserting the first vector must not demote it
        index.upsert(first, vec![3.0, 0.0], attrs(doc, DocumentType::Text)).unwrap();
        let results = index
            .search(&[1.0, 0.0], 10, 0.0, &SearchFilter::default())
            .unwrap();
        assert_eq!(results[0].chunk_id, first);
    }

    #[test]
    fn test_filter_applied_before_top_k() {
        let index = VectorIndex::new(2).unwrap();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let best_a = Uuid::new_v4();
        let only_b = Uuid::new_v4();

        // Document A holds the closest vectors; B holds a weaker one
        index.upsert(best_a, vec![1.0, 0.0], attrs(doc_a, DocumentType::Pdf)).unwrap();
        index
            .upsert(Uuid::new_v4(), vec![0.9, 0.1], attrs(doc_a, DocumentType::Pdf))
            .unwrap();
        index.upsert(only_b, vec![0.5, 0.5], attrs(doc_b, DocumentType::Html)).unwrap();

        // With k=1 and a filter for B, A's vectors must not eat the slot
        let filter = SearchFilter::new(Some(&[doc_b]), None);
        let results = index.search(&[1.0, 0.0], 1, 0.0, &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, only_b);

        // Same through the type filter
        let filter = SearchFilter::new(None, Some(&[DocumentType::Html]));
        let results = index.search(&[1.0, 0.0], 1, 0.0, &filter).unwrap();
        assert_eq!(results[0].chunk_id, only_b);
    }

    #[test]
    fn test_min_score_drops_candidates() {
        let index = VectorIndex::new(2).unwrap();
        let doc = Uuid::new_v4();
        index
            .upsert(Uuid::new_v4(), vec![1.0, 0.0], attrs(doc, DocumentType::Text))
            .unwrap();
        index
            .upsert(Uuid::new_v4(), vec![0.0, 1.0], attrs(doc, DocumentType::Text))
            .unwrap();

        let results = index
            .search(&[1.0, 0.0], 10, 0.5, &SearchFilter::default())
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let index = VectorIndex::new(2).unwrap();
        assert!(!index.delete(Uuid::new_v4()));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_remove_document() {
        let index = VectorIndex::new(2).unwrap();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        index
            .upsert(Uuid::new_v4(), vec![1.0, 0.0], attrs(doc_a, DocumentType::Text))
            .unwrap();
        index
            .upsert(Uuid::new_v4(), vec![0.0, 1.0], attrs(doc_a, DocumentType::Text))
            .unwrap();
        index
            .upsert(Uuid::new_v4(), vec![1.0, 1.0], attrs(doc_b, DocumentType::Text))
            .unwrap();

        assert_eq!(index.remove_document(doc_a), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove_document(doc_a), 0);
    }

    #[test]
    fn test_zero_k_returns_empty() {
        let index = VectorIndex::new(2).unwrap();
        index
            .upsert(
                Uuid::new_v4(),
                vec![1.0, 0.0],
                attrs(Uuid::new_v4(), DocumentType::Text),
            )
            .unwrap();
        let results = index
            .search(&[1.0, 0.0], 0, 0.0, &SearchFilter::default())
            .unwrap();
        assert!(results.is_empty());
    }
}
