//! Chronicler Wiki
//!
//! Turns ranked search results into citation-backed wiki entries:
//! - `WikiSynthesizer`: clusters results into a bounded section tree with
//!   per-section confidence and deduplicated sources
//! - `renderer`: serializes entries to markdown, HTML, plain text, or
//!   structured JSON

pub mod renderer;
pub mod synthesizer;

pub use renderer::{render, OutputFormat};
pub use synthesizer::{
    suggest_topics, SourceComparison, SynthesisOptions, TopicSuggestions, WikiSynthesizer,
};
