//! Search handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::AppState;
use chronicler_common::{
    embeddings::embed_timed,
    errors::{AppError, Result},
    metrics,
    models::{DocumentType, SearchQuery, SearchResponse, SearchResult},
};
use chronicler_search::RetrievalOptions;

/// GET /search parameters; list filters arrive comma-separated
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub min_score: f32,

    pub document_type: Option<String>,

    pub document_id: Option<String>,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct ContextParams {
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_window() -> usize {
    2
}

/// The matched chunk in a context response
#[derive(Serialize)]
pub struct TargetChunk {
    pub id: Uuid,
    pub text: String,
    pub index: usize,
}

#[derive(Serialize)]
pub struct ContextEntry {
    pub id: Uuid,
    pub text: String,
    pub index: usize,
    pub is_target: bool,
}

#[derive(Serialize)]
pub struct ContextResponse {
    pub target_chunk: TargetChunk,
    pub context: Vec<ContextEntry>,
    pub document_id: Uuid,
    pub document_title: Option<String>,
}

/// Perform semantic search
pub async fn search(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    run_search(&state, query).await.map(Json)
}

/// Semantic search (GET endpoint for convenience)
pub async fn search_get(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let document_types = params
        .document_type
        .as_deref()
        .map(parse_document_types)
        .transpose()?;
    let document_ids = params
        .document_id
        .as_deref()
        .map(parse_document_ids)
        .transpose()?;

    let query = SearchQuery {
        query: params.q,
        limit: params.limit,
        min_score: params.min_score,
        document_ids,
        document_types,
    };

    run_search(&state, query).await.map(Json)
}

/// Find chunks similar to a given chunk
pub async fn search_similar(
    State(state): State<AppState>,
    Path(chunk_id): Path<Uuid>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Vec<SearchResult>>> {
    let limit = params.limit.min(state.config.search.max_limit);
    let results = state.retriever.similar(chunk_id, limit).await?;
    Ok(Json(results))
}

/// Get a chunk with its surrounding context window
pub async fn get_chunk_context(
    State(state): State<AppState>,
    Path(chunk_id): Path<Uuid>,
    Query(params): Query<ContextParams>,
) -> Result<Json<ContextResponse>> {
    let context = state.retriever.context(chunk_id, params.window).await?;

    let target = context
        .chunks
        .iter()
        .find(|c| c.is_target)
        .ok_or_else(|| AppError::ChunkNotFound {
            id: chunk_id.to_string(),
        })?;

    Ok(Json(ContextResponse {
        target_chunk: TargetChunk {
            id: target.chunk.chunk_id,
            text: target.chunk.text.clone(),
            index: target.chunk.metadata.chunk_index,
        },
        context: context
            .chunks
            .iter()
            .map(|entry| ContextEntry {
                id: entry.chunk.chunk_id,
                text: entry.chunk.text.clone(),
                index: entry.chunk.metadata.chunk_index,
                is_target: entry.is_target,
            })
            .collect(),
        document_id: context.document_id,
        document_title: context.document_title,
    }))
}

async fn run_search(state: &AppState, query: SearchQuery) -> Result<SearchResponse> {
    let start = Instant::now();

    if query.query.trim().is_empty() {
        return Err(AppError::Validation {
            message: "query must not be empty".to_string(),
            field: Some("query".to_string()),
        });
    }

    let limit = query.limit.min(state.config.search.max_limit);

    let query_vector = embed_timed(
        state.embedder.as_ref(),
        &query.query,
        state.config.embedding_timeout(),
    )
    .await?;

    let results = state
        .retriever
        .search(
            &query_vector,
            &RetrievalOptions {
                limit,
                min_score: query.min_score,
                document_ids: query.document_ids.clone(),
                document_types: query.document_types.clone(),
            },
        )
        .await?;

    let search_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::record_search(search_time_ms / 1000.0, results.len());

    tracing::info!(
        query = %query.query,
        results = results.len(),
        latency_ms = search_time_ms,
        "Search completed"
    );

    Ok(SearchResponse {
        query: query.query,
        total_results: results.len(),
        results,
        search_time_ms,
    })
}

fn parse_document_types(raw: &str) -> Result<Vec<DocumentType>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn parse_document_ids(raw: &str) -> Result<Vec<Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| AppError::InvalidArgument {
                message: format!("invalid document id: {}", s),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_types() {
        let types = parse_document_types("pdf, markdown").unwrap();
        assert_eq!(types, vec![DocumentType::Pdf, DocumentType::Markdown]);

        assert!(parse_document_types("pdf,floppy").is_err());
    }

    #[test]
    fn test_parse_document_ids() {
        let id = Uuid::new_v4();
        let ids = parse_document_ids(&id.to_string()).unwrap();
        assert_eq!(ids, vec![id]);

        assert!(parse_document_ids("not-a-uuid").is_err());
    }
}
