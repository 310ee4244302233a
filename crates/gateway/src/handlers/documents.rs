//! Document management handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use chronicler_common::{
    errors::Result,
    models::{ChunkMetadata, Document, DocumentType, KnowledgeBaseStats, SectionRef},
};
use chronicler_search::ReconstructedText;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: usize,

    #[serde(default = "default_page_limit")]
    pub limit: usize,
}

fn default_page_limit() -> usize {
    50
}

/// Paginated document listing
#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Document details with its section outline
#[derive(Serialize)]
pub struct DocumentResponse {
    pub document_id: Uuid,
    pub source_path: String,
    pub document_title: Option<String>,
    pub document_type: DocumentType,
    pub total_chunks: usize,
    pub ingested_at: String,
    pub sections: Vec<SectionRef>,
}

#[derive(Serialize)]
pub struct ChunkSummary {
    pub chunk_id: Uuid,
    pub text: String,
    pub chunk_index: usize,
    pub page_number: Option<u32>,
    pub section: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentChunksResponse {
    pub document_id: Uuid,
    pub chunks: Vec<ChunkSummary>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub document_id: Uuid,
    pub chunks_deleted: usize,
}

#[derive(Serialize)]
pub struct ChunkResponse {
    pub chunk_id: Uuid,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// List all ingested documents
pub async fn list_documents(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Json<DocumentListResponse> {
    let (documents, total) = state.store.list(pagination.offset, pagination.limit).await;

    Json(DocumentListResponse {
        documents,
        total,
        offset: pagination.offset,
        limit: pagination.limit,
    })
}

/// Get document details and metadata
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>> {
    let document = state.store.get(document_id).await?;

    Ok(Json(DocumentResponse {
        document_id: document.document_id,
        source_path: document.source_path,
        document_title: document.title,
        document_type: document.document_type,
        total_chunks: document.total_chunks,
        ingested_at: document.ingested_at.to_rfc3339(),
        sections: document.sections,
    }))
}

/// Get one page of a document's chunks
pub async fn get_document_chunks(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<DocumentChunksResponse>> {
    let page = state
        .store
        .get_chunks(document_id, pagination.offset, pagination.limit)
        .await?;

    Ok(Json(DocumentChunksResponse {
        document_id,
        chunks: page
            .chunks
            .into_iter()
            .map(|chunk| ChunkSummary {
                chunk_id: chunk.chunk_id,
                section: chunk.metadata.section_label(),
                chunk_index: chunk.metadata.chunk_index,
                page_number: chunk.metadata.page_number,
                text: chunk.text,
            })
            .collect(),
        total: page.total,
        offset: pagination.offset,
        limit: pagination.limit,
    }))
}

/// Get the full reconstructed text of a document
pub async fn get_document_text(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<ReconstructedText>> {
    let text = state.store.reconstruct_text(document_id).await?;
    Ok(Json(text))
}

/// Delete a document and all its chunks
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>> {
    let chunks_deleted = state.store.delete(document_id).await?;

    tracing::info!(
        document_id = %document_id,
        chunks_deleted,
        "Document deleted via API"
    );

    Ok(Json(DeleteResponse {
        status: "deleted",
        document_id,
        chunks_deleted,
    }))
}

/// Get a specific chunk by ID
pub async fn get_chunk(
    State(state): State<AppState>,
    Path(chunk_id): Path<Uuid>,
) -> Result<Json<ChunkResponse>> {
    let chunk = state.store.get_chunk(chunk_id).await?;

    Ok(Json(ChunkResponse {
        chunk_id: chunk.chunk_id,
        text: chunk.text,
        metadata: chunk.metadata,
    }))
}

/// Aggregate knowledge base statistics
pub async fn get_stats(State(state): State<AppState>) -> Json<KnowledgeBaseStats> {
    Json(state.store.stats().await)
}
