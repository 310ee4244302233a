//! Ingestion handlers
//!
//! Accepts documents already parsed into content blocks (format parsing
//! happens outside this service) and runs them through the write path.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use chronicler_common::errors::{AppError, Result};
use chronicler_ingestion::{IngestReport, ParsedDocument};

/// Maximum documents accepted per batch
const MAX_BATCH_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub documents: Vec<ParsedDocument>,
}

#[derive(Serialize)]
pub struct IngestBatchResponse {
    pub results: Vec<IngestReport>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Ingest a batch of parsed documents.
///
/// Each document reports its own outcome; a failing document never aborts
/// its siblings.
pub async fn ingest_documents(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestBatchResponse>)> {
    if request.documents.is_empty() {
        return Err(AppError::Validation {
            message: "documents must not be empty".to_string(),
            field: Some("documents".to_string()),
        });
    }
    if request.documents.len() > MAX_BATCH_SIZE {
        return Err(AppError::Validation {
            message: format!("at most {} documents per batch", MAX_BATCH_SIZE),
            field: Some("documents".to_string()),
        });
    }

    let results = state.pipeline.ingest_batch(request.documents).await;

    let succeeded = results.iter().filter(|r| r.status == "success").count();
    let failed = results.len() - succeeded;

    tracing::info!(total = results.len(), succeeded, failed, "Batch ingested");

    let status = if succeeded > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((
        status,
        Json(IngestBatchResponse {
            total: results.len(),
            succeeded,
            failed,
            results,
        }),
    ))
}
