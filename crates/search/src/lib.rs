//! Chronicler Search
//!
//! The in-process retrieval engine:
//! - `ChunkStore`: documents and their ordered chunks, with per-document
//!   atomic replacement and deletion
//! - `VectorIndex`: exact cosine similarity search with pre-top-k filtering
//! - `Retriever`: ranked query answering, similar-chunk lookup, and
//!   context-window expansion

pub mod retriever;
pub mod store;
pub mod vector;

pub use retriever::{ChunkContext, ContextChunk, RetrievalOptions, Retriever};
pub use store::{ChunkPage, ChunkStore, EmbeddedChunk, ReconstructedText};
pub use vector::{ScoredChunk, SearchFilter, VectorAttributes, VectorIndex};
