//! Chronicler API Gateway
//!
//! The HTTP entry point for the retrieval and synthesis engine.
//! Handles:
//! - Document management (list, inspect, full text, delete)
//! - Semantic search, similar-chunk lookup, and context expansion
//! - Wiki entry generation and topic suggestion
//! - Ingestion of parsed documents
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use chronicler_common::{
    config::AppConfig,
    embeddings::{create_embedder, Embedder},
    metrics,
};
use chronicler_ingestion::IngestionPipeline;
use chronicler_search::{ChunkStore, Retriever, VectorIndex};
use chronicler_wiki::{SynthesisOptions, WikiSynthesizer};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<ChunkStore>,
    pub retriever: Arc<Retriever>,
    pub synthesizer: Arc<WikiSynthesizer>,
    pub pipeline: Arc<IngestionPipeline>,
    pub embedder: Arc<dyn Embedder>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    let config = Arc::new(config);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting Chronicler API Gateway v{}", chronicler_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr =
            SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Wire up the engine
    let embedder = create_embedder(&config.embedding)?;
    let index = Arc::new(VectorIndex::new(embedder.dimension())?);
    let store = Arc::new(ChunkStore::new(index));
    let retriever = Arc::new(Retriever::new(
        store.clone(),
        config.search.overfetch_factor,
    ));
    let synthesizer = Arc::new(WikiSynthesizer::new(
        retriever.clone(),
        embedder.clone(),
        SynthesisOptions::from_config(&config.wiki),
        config.embedding_timeout(),
    ));
    let pipeline = Arc::new(IngestionPipeline::new(
        store.clone(),
        embedder.clone(),
        config.chunking.clone(),
        config.embedding_timeout(),
    ));

    let state = AppState {
        config: config.clone(),
        store,
        retriever,
        synthesizer,
        pipeline,
        embedder,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Document endpoints
        .route("/documents", get(handlers::documents::list_documents))
        .route("/documents/{id}", get(handlers::documents::get_document))
        .route("/documents/{id}", delete(handlers::documents::delete_document))
        .route(
            "/documents/{id}/chunks",
            get(handlers::documents::get_document_chunks),
        )
        .route(
            "/documents/{id}/text",
            get(handlers::documents::get_document_text),
        )
        .route("/chunks/{id}", get(handlers::documents::get_chunk))
        .route("/stats", get(handlers::documents::get_stats))
        // Search endpoints
        .route("/search", post(handlers::search::search))
        .route("/search", get(handlers::search::search_get))
        .route(
            "/search/similar/{chunk_id}",
            get(handlers::search::search_similar),
        )
        .route(
            "/search/context/{chunk_id}",
            get(handlers::search::get_chunk_context),
        )
        // Wiki endpoints
        .route("/wiki/generate", post(handlers::wiki::generate))
        .route("/wiki/generate", get(handlers::wiki::generate_get))
        .route("/wiki/section", post(handlers::wiki::generate_section))
        .route("/wiki/compare", post(handlers::wiki::compare_sources))
        .route("/wiki/topics", get(handlers::wiki::suggest_topics))
        // Ingestion
        .route("/ingest", post(handlers::ingest::ingest_documents));

    // Compose the app
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
