//! Chronicler Common Library
//!
//! Shared code for the Chronicler services including:
//! - Core data models (documents, chunks, search results, wiki entries)
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension (all-MiniLM-class models)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
