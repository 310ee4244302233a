//! Wiki generation handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use chronicler_common::{
    errors::{AppError, Result},
    metrics,
    models::{WikiEntry, WikiSection},
};
use chronicler_wiki::{render, suggest_topics as suggest, OutputFormat, SourceComparison};

/// Request to generate a wiki entry
#[derive(Debug, Deserialize, Validate)]
pub struct WikiGenerateRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    #[serde(default = "default_max_sources")]
    #[validate(range(min = 1, max = 50))]
    pub max_sources: usize,

    #[serde(default = "default_format")]
    pub output_format: String,

    #[serde(default = "default_include_sources")]
    pub include_sources: bool,
}

fn default_max_sources() -> usize {
    10
}

fn default_format() -> String {
    "markdown".to_string()
}

fn default_include_sources() -> bool {
    true
}

/// GET variant of the generate request
#[derive(Debug, Deserialize)]
pub struct WikiGenerateParams {
    pub q: String,

    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_include_sources")]
    pub include_sources: bool,
}

/// Response with generated wiki content
#[derive(Serialize)]
pub struct WikiGenerateResponse {
    pub entry: WikiEntry,
    pub content: String,
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct SectionParams {
    pub topic: String,

    pub context: Option<String>,

    #[serde(default = "default_section_sources")]
    pub max_sources: usize,
}

fn default_section_sources() -> usize {
    5
}

#[derive(Serialize)]
pub struct SectionSourceResponse {
    pub document_title: Option<String>,
    pub source_path: String,
    pub page_number: Option<u32>,
    pub section: Option<String>,
    pub relevance_score: f32,
    pub excerpt: String,
}

#[derive(Serialize)]
pub struct SectionResponse {
    pub heading: String,
    pub content: String,
    pub confidence: f32,
    pub sources: Vec<SectionSourceResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub query: String,

    #[serde(default = "default_max_per_source")]
    pub max_per_source: usize,
}

fn default_max_per_source() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct TopicsParams {
    #[serde(default = "default_topics_limit")]
    pub limit: usize,
}

fn default_topics_limit() -> usize {
    20
}

/// Generate a wiki entry for a topic or question
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<WikiGenerateRequest>,
) -> Result<Json<WikiGenerateResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    run_generate(
        &state,
        &request.query,
        request.max_sources,
        &request.output_format,
        request.include_sources,
    )
    .await
    .map(Json)
}

/// Generate a wiki entry (GET endpoint)
pub async fn generate_get(
    State(state): State<AppState>,
    Query(params): Query<WikiGenerateParams>,
) -> Result<Json<WikiGenerateResponse>> {
    if params.q.trim().is_empty() {
        return Err(AppError::Validation {
            message: "q must not be empty".to_string(),
            field: Some("q".to_string()),
        });
    }

    run_generate(
        &state,
        &params.q,
        params.max_sources.clamp(1, 50),
        &params.format,
        params.include_sources,
    )
    .await
    .map(Json)
}

/// Generate a single wiki section for a topic
pub async fn generate_section(
    State(state): State<AppState>,
    Query(params): Query<SectionParams>,
) -> Result<Json<SectionResponse>> {
    let section: WikiSection = state
        .synthesizer
        .synthesize_section(
            &params.topic,
            params.context.as_deref(),
            params.max_sources.clamp(1, 20),
        )
        .await?;

    Ok(Json(SectionResponse {
        heading: section.heading,
        content: section.content,
        confidence: section.confidence,
        sources: section
            .sources
            .into_iter()
            .map(|s| SectionSourceResponse {
                document_title: s.document_title,
                source_path: s.source_path,
                page_number: s.page_number,
                section: s.section,
                relevance_score: s.relevance_score,
                excerpt: s.excerpt,
            })
            .collect(),
    }))
}

/// Compare information about a topic across source documents
pub async fn compare_sources(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<SourceComparison>> {
    let comparison = state
        .synthesizer
        .compare(&params.query, params.max_per_source.clamp(1, 10))
        .await?;
    Ok(Json(comparison))
}

/// Suggest wiki topics based on indexed content
pub async fn suggest_topics(
    State(state): State<AppState>,
    Query(params): Query<TopicsParams>,
) -> Json<chronicler_wiki::TopicSuggestions> {
    let (documents, _) = state.store.list(0, usize::MAX).await;
    Json(suggest(&documents, params.limit.clamp(1, 100)))
}

async fn run_generate(
    state: &AppState,
    query: &str,
    max_sources: usize,
    format: &str,
    include_sources: bool,
) -> Result<WikiGenerateResponse> {
    let start = Instant::now();

    // Reject unsupported formats before doing the expensive work
    let format: OutputFormat = format.parse()?;

    let entry = state.synthesizer.generate(query, max_sources).await?;
    let content = render(&entry, format, include_sources)?;

    metrics::record_wiki_generation(
        start.elapsed().as_secs_f64(),
        entry.sections.len(),
        entry.all_sources.len(),
    );

    tracing::info!(
        query = %query,
        sections = entry.sections.len(),
        sources = entry.all_sources.len(),
        format = format.as_str(),
        "Wiki entry generated via API"
    );

    Ok(WikiGenerateResponse {
        entry,
        content,
        format: format.as_str().to_string(),
    })
}
