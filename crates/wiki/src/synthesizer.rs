//! Wiki entry synthesis
//!
//! Builds a hierarchical, citation-backed article from ranked search
//! results. Synthesis is deterministic: section content is a merge of
//! contributing chunk texts, so every sentence traces back to a stored
//! chunk. Clustering follows the chunks' section hierarchy, the tree depth
//! is bounded, and confidence is a monotonic aggregate of contributor
//! scores.

use chronicler_common::config::WikiConfig;
use chronicler_common::embeddings::{embed_timed, Embedder};
use chronicler_common::errors::Result;
use chronicler_common::models::{
    Document, SearchResult, WikiEntry, WikiSection, WikiSource,
};
use chronicler_search::{RetrievalOptions, Retriever};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Heading used for results that carry no section hierarchy
const OVERVIEW_HEADING: &str = "Overview";

/// Summary emitted when retrieval finds nothing
const NO_RESULTS_SUMMARY: &str = "No relevant information found in the knowledge base.";

/// Synthesis tuning, passed per synthesizer rather than read from globals
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Minimum relevance score for a chunk to contribute
    pub min_score: f32,

    /// Clusters smaller than this collapse into their parent section
    pub min_cluster_size: usize,

    /// Maximum depth of the section tree
    pub max_section_depth: usize,

    /// Maximum excerpt length in source citations
    pub excerpt_length: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            min_cluster_size: 2,
            max_section_depth: 3,
            excerpt_length: 200,
        }
    }
}

impl SynthesisOptions {
    pub fn from_config(config: &WikiConfig) -> Self {
        Self {
            min_score: config.min_score,
            min_cluster_size: config.min_cluster_size,
            max_section_depth: config.max_section_depth,
            excerpt_length: config.excerpt_length,
        }
    }
}

/// Per-document excerpts for source comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonExcerpt {
    pub text: String,
    pub score: f32,
    pub page_number: Option<u32>,
    pub section: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentComparison {
    pub document_id: Uuid,
    pub document_title: String,
    pub source_path: String,
    pub excerpts: Vec<ComparisonExcerpt>,
}

/// A topic compared across its source documents
#[derive(Debug, Clone, Serialize)]
pub struct SourceComparison {
    pub query: String,
    pub sources: Vec<DocumentComparison>,
    pub source_count: usize,
}

/// Suggested wiki topics drawn from the indexed corpus
#[derive(Debug, Clone, Serialize)]
pub struct TopicSuggestions {
    pub topics: Vec<String>,
    pub total: usize,
}

/// Generates wiki entries from the document knowledge base
pub struct WikiSynthesizer {
    retriever: Arc<Retriever>,
    embedder: Arc<dyn Embedder>,
    options: SynthesisOptions,
    embed_timeout: Duration,
}

impl WikiSynthesizer {
    pub fn new(
        retriever: Arc<Retriever>,
        embedder: Arc<dyn Embedder>,
        options: SynthesisOptions,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            embedder,
            options,
            embed_timeout,
        }
    }

    /// Generate a wiki entry for a query.
    ///
    /// Zero retrieved results is not an error: the entry degrades to an
    /// explicit empty state. Citations are always retained on the entry;
    /// suppressing them is the renderer's job.
    pub async fn generate(&self, query: &str, max_sources: usize) -> Result<WikiEntry> {
        let query_vector =
            embed_timed(self.embedder.as_ref(), query, self.embed_timeout).await?;

        let results = self
            .retriever
            .search(
                &query_vector,
                &RetrievalOptions {
                    limit: max_sources,
                    min_score: self.options.min_score,
                    document_ids: None,
                    document_types: None,
                },
            )
            .await?;

        let title = derive_title(query);

        if results.is_empty() {
            info!(query = %query, "No sources found for wiki entry");
            return Ok(WikiEntry {
                entry_id: Uuid::new_v4(),
                title,
                summary: NO_RESULTS_SUMMARY.to_string(),
                sections: Vec::new(),
                all_sources: Vec::new(),
                generated_at: Utc::now(),
                query: query.to_string(),
            });
        }

        // Expansion passes can surface the same chunk twice
        let results = dedup_by_chunk_id(results);

        let summary = summarize(&results);
        let sections = self.build_sections(&results);
        let all_sources = collect_sources(&sections);

        info!(
            query = %query,
            sections = sections.len(),
            sources = all_sources.len(),
            "Wiki entry generated"
        );

        Ok(WikiEntry {
            entry_id: Uuid::new_v4(),
            title,
            summary,
            sections,
            all_sources,
            generated_at: Utc::now(),
            query: query.to_string(),
        })
    }

    /// Generate a single free-standing section for a topic
    pub async fn synthesize_section(
        &self,
        topic: &str,
        context: Option<&str>,
        max_sources: usize,
    ) -> Result<WikiSection> {
        let search_text = match context {
            Some(context) => format!("{} {}", context, topic),
            None => topic.to_string(),
        };
        let query_vector =
            embed_timed(self.embedder.as_ref(), &search_text, self.embed_timeout).await?;

        let results = self
            .retriever
            .search(
                &query_vector,
                &RetrievalOptions {
                    limit: max_sources,
                    min_score: self.options.min_score,
                    document_ids: None,
                    document_types: None,
                },
            )
            .await?;

        if results.is_empty() {
            return Ok(WikiSection {
                heading: topic.to_string(),
                content: "No information available.".to_string(),
                sources: Vec::new(),
                confidence: 0.0,
                subsections: Vec::new(),
            });
        }

        let results = dedup_by_chunk_id(results);
        let scores: Vec<f32> = results.iter().map(|r| r.score).collect();

        Ok(WikiSection {
            heading: topic.to_string(),
            content: merge_content(&results),
            sources: results
                .iter()
                .map(|r| to_source(r, self.options.excerpt_length))
                .collect(),
            confidence: aggregate_confidence(&scores),
            subsections: Vec::new(),
        })
    }

    /// Compare what each source document says about a topic
    pub async fn compare(&self, query: &str, max_per_source: usize) -> Result<SourceComparison> {
        let query_vector =
            embed_timed(self.embedder.as_ref(), query, self.embed_timeout).await?;

        let results = self
            .retriever
            .search(
                &query_vector,
                &RetrievalOptions {
                    limit: 50,
                    min_score: self.options.min_score,
                    document_ids: None,
                    document_types: None,
                },
            )
            .await?;

        let mut order: Vec<Uuid> = Vec::new();
        let mut by_document: std::collections::HashMap<Uuid, DocumentComparison> =
            std::collections::HashMap::new();

        for result in &results {
            let document_id = result.metadata.document_id;
            let entry = by_document.entry(document_id).or_insert_with(|| {
                order.push(document_id);
                DocumentComparison {
                    document_id,
                    document_title: result
                        .metadata
                        .document_title
                        .clone()
                        .unwrap_or_else(|| result.metadata.source_path.clone()),
                    source_path: result.metadata.source_path.clone(),
                    excerpts: Vec::new(),
                }
            });
            if entry.excerpts.len() < max_per_source {
                entry.excerpts.push(ComparisonExcerpt {
                    text: result.text.clone(),
                    score: result.score,
                    page_number: result.metadata.page_number,
                    section: result.metadata.section_label(),
                });
            }
        }

        let sources: Vec<DocumentComparison> = order
            .into_iter()
            .filter_map(|id| by_document.remove(&id))
            .collect();
        let source_count = sources.len();

        Ok(SourceComparison {
            query: query.to_string(),
            sources,
            source_count,
        })
    }

    /// Cluster results on their top-level heading, then refine within
    fn build_sections(&self, results: &[SearchResult]) -> Vec<WikiSection> {
        let clusters = group_by_heading(results, 0);

        let mut sections: Vec<WikiSection> = clusters
            .into_iter()
            .map(|(heading, members)| {
                self.build_section(
                    heading.unwrap_or_else(|| OVERVIEW_HEADING.to_string()),
                    members,
                    1,
                )
            })
            .collect();

        sections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sections
    }

    /// Build one section, recursing on deeper headings while the tree is
    /// allowed to grow. Clusters under the minimum size stay in the parent.
    fn build_section(
        &self,
        heading: String,
        results: Vec<SearchResult>,
        depth: usize,
    ) -> WikiSection {
        let mut direct = Vec::new();
        let mut subsections = Vec::new();

        if depth < self.options.max_section_depth {
            for (key, members) in group_by_heading(&results, depth) {
                match key {
                    Some(sub_heading) if members.len() >= self.options.min_cluster_size => {
                        subsections.push(self.build_section(sub_heading, members, depth + 1));
                    }
                    _ => direct.extend(members),
                }
            }
        } else {
            direct = results;
        }

        direct.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        subsections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let confidence = if direct.is_empty() {
            let child_scores: Vec<f32> = subsections.iter().map(|s| s.confidence).collect();
            aggregate_confidence(&child_scores)
        } else {
            let scores: Vec<f32> = direct.iter().map(|r| r.score).collect();
            aggregate_confidence(&scores)
        };

        WikiSection {
            heading,
            content: merge_content(&direct),
            sources: direct
                .iter()
                .map(|r| to_source(r, self.options.excerpt_length))
                .collect(),
            confidence,
            subsections,
        }
    }
}

/// Suggest wiki topics from document titles and section headings
pub fn suggest_topics(documents: &[Document], limit: usize) -> TopicSuggestions {
    let mut topics: HashSet<String> = HashSet::new();

    for document in documents {
        if let Some(ref title) = document.title {
            topics.insert(title.clone());
        }
        for section in &document.sections {
            for heading in &section.hierarchy {
                // Very short headings make poor topics
                if heading.len() > 5 {
                    topics.insert(heading.clone());
                }
            }
        }
    }

    let total = topics.len();
    let mut topics: Vec<String> = topics.into_iter().collect();
    topics.sort();
    topics.truncate(limit);

    TopicSuggestions { topics, total }
}

/// Group results by the heading at one hierarchy level, preserving
/// first-appearance order
fn group_by_heading(
    results: &[SearchResult],
    level: usize,
) -> Vec<(Option<String>, Vec<SearchResult>)> {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut groups: std::collections::HashMap<Option<String>, Vec<SearchResult>> =
        std::collections::HashMap::new();

    for result in results {
        let key = result.metadata.section_hierarchy.get(level).cloned();
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        group.push(result.clone());
    }

    order
        .into_iter()
        .filter_map(|key| {
            let members = groups.remove(&key)?;
            Some((key, members))
        })
        .collect()
}

fn dedup_by_chunk_id(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.chunk_id))
        .collect()
}

/// Merge contributor texts, best-scored first, skipping near-duplicates
fn merge_content(results: &[SearchResult]) -> String {
    let mut seen_prefixes = HashSet::new();
    let mut paragraphs = Vec::new();

    for result in results {
        let text = result.text.trim();
        if text.is_empty() {
            continue;
        }
        let normalized: String = text.to_lowercase().chars().take(100).collect();
        if !seen_prefixes.insert(normalized) {
            continue;
        }
        paragraphs.push(text.to_string());
    }

    paragraphs.join("\n\n")
}

/// Aggregate contributor scores into a section confidence.
///
/// A geometric-decay weighted mean biases toward the best contributor; the
/// support factor rises with the number of agreeing contributors, so one
/// weak source always lands below several strong ones.
fn aggregate_confidence(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut numerator = 0.0f32;
    let mut denominator = 0.0f32;
    let mut weight = 1.0f32;
    for score in &sorted {
        numerator += score * weight;
        denominator += weight;
        weight *= 0.5;
    }

    let weighted_mean = numerator / denominator;
    let support = 1.0 - 1.0 / (2.0 * sorted.len() as f32);

    (weighted_mean * support).clamp(0.0, 1.0)
}

fn to_source(result: &SearchResult, excerpt_length: usize) -> WikiSource {
    let excerpt = if result.text.chars().count() > excerpt_length {
        let truncated: String = result.text.chars().take(excerpt_length).collect();
        format!("{}...", truncated)
    } else {
        result.text.clone()
    };

    WikiSource {
        chunk_id: result.chunk_id,
        document_id: result.metadata.document_id,
        document_title: result.metadata.document_title.clone(),
        source_path: result.metadata.source_path.clone(),
        page_number: result.metadata.page_number,
        section: result.metadata.section_label(),
        relevance_score: result.score,
        excerpt,
    }
}

/// Union of every source cited in the tree, deduplicated by chunk id in
/// first-appearance order, walking depth-first from the top
fn collect_sources(sections: &[WikiSection]) -> Vec<WikiSource> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for section in sections {
        collect_sources_into(section, &mut seen, &mut sources);
    }
    sources
}

fn collect_sources_into(
    section: &WikiSection,
    seen: &mut HashSet<Uuid>,
    sources: &mut Vec<WikiSource>,
) {
    for source in &section.sources {
        if seen.insert(source.chunk_id) {
            sources.push(source.clone());
        }
    }
    for subsection in &section.subsections {
        collect_sources_into(subsection, seen, sources);
    }
}

/// Turn a query into a wiki-style title: strip question phrasing, title-case
fn derive_title(query: &str) -> String {
    let mut title = query.trim().trim_end_matches('?').trim().to_string();

    let prefix = regex_lite::Regex::new(r"(?i)^(what is|what are|how to|how does|why|when|where|who)\s+")
        .expect("static pattern");
    if let Some(found) = prefix.find(&title) {
        title = title[found.end()..].to_string();
    }

    title_case(&title)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Summary built from the leading sentences of the best results
fn summarize(results: &[SearchResult]) -> String {
    let mut excerpts = Vec::new();

    for result in results.iter().take(3) {
        let text = result.text.trim();
        if text.is_empty() {
            continue;
        }
        let head: String = text.chars().take(200).collect();
        let excerpt = match head.find(". ") {
            Some(pos) => head[..pos + 1].to_string(),
            None if text.chars().count() > 200 => format!("{}...", head),
            None => text.to_string(),
        };
        excerpts.push(excerpt);
    }

    excerpts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicler_common::embeddings::HashEmbedder;
    use chronicler_common::models::{
        ChunkMetadata, ContentType, DocumentType, StoredChunk,
    };
    use chronicler_search::{ChunkStore, EmbeddedChunk, VectorIndex};

    const DIM: usize = 384;

    fn synthesizer_over(store: Arc<ChunkStore>) -> WikiSynthesizer {
        let retriever = Arc::new(Retriever::new(store, 4));
        WikiSynthesizer::new(
            retriever,
            Arc::new(HashEmbedder::new(DIM)),
            SynthesisOptions::default(),
            Duration::from_secs(5),
        )
    }

    fn empty_store() -> Arc<ChunkStore> {
        Arc::new(ChunkStore::new(Arc::new(VectorIndex::new(DIM).unwrap())))
    }

    async fn ingest_doc(
        store: &ChunkStore,
        title: &str,
        chunks: &[(&str, &[&str])],
    ) -> Uuid {
        let embedder = HashEmbedder::new(DIM);
        let document_id = Uuid::new_v4();
        let ingested_at = Utc::now();
        let mut cursor = 0usize;
        let mut embedded = Vec::new();

        for (i, (text, hierarchy)) in chunks.iter().enumerate() {
            let char_start = cursor;
            let char_end = cursor + text.chars().count();
            cursor = char_end + 2;
            embedded.push(EmbeddedChunk {
                chunk: StoredChunk {
                    chunk_id: Uuid::new_v4(),
                    text: text.to_string(),
                    metadata: ChunkMetadata {
                        document_id,
                        source_path: format!("docs/{}.txt", title),
                        source_hash: "beef".into(),
                        document_title: Some(title.to_string()),
                        document_type: DocumentType::Text,
                        page_number: None,
                        section_hierarchy: hierarchy.iter().map(|s| s.to_string()).collect(),
                        paragraph_index: i,
                        chunk_index: i,
                        total_chunks: chunks.len(),
                        content_type: ContentType::Paragraph,
                        char_start,
                        char_end,
                        ingested_at,
                    },
                },
                embedding: embedder.embed(text).await.unwrap(),
            });
        }

        let document = Document {
            document_id,
            source_path: format!("docs/{}.txt", title),
            source_hash: "beef".into(),
            title: Some(title.to_string()),
            document_type: DocumentType::Text,
            ingested_at,
            sections: Vec::new(),
            total_chunks: chunks.len(),
        };
        store.put(document, embedded).await.unwrap();
        document_id
    }

    #[test]
    fn test_confidence_single_weak_below_several_strong() {
        let weak = aggregate_confidence(&[0.4]);
        let strong = aggregate_confidence(&[0.9, 0.85, 0.88]);
        assert!(weak < strong);
    }

    #[test]
    fn test_confidence_monotonic_in_support() {
        let one = aggregate_confidence(&[0.8]);
        let two = aggregate_confidence(&[0.8, 0.8]);
        let three = aggregate_confidence(&[0.8, 0.8, 0.8]);
        assert!(one < two);
        assert!(two < three);
    }

    #[test]
    fn test_confidence_monotonic_in_scores() {
        let low = aggregate_confidence(&[0.5, 0.4]);
        let high = aggregate_confidence(&[0.9, 0.4]);
        assert!(low < high);
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(aggregate_confidence(&[]), 0.0);
        let full = aggregate_confidence(&[1.0; 10]);
        assert!(full <= 1.0);
        assert!(full > 0.9);
    }

    #[test]
    fn test_derive_title_strips_question() {
        assert_eq!(derive_title("what is photosynthesis?"), "Photosynthesis");
        assert_eq!(derive_title("How does erosion work"), "Erosion Work");
        assert_eq!(derive_title("glacier formation"), "Glacier Formation");
    }

    #[test]
    fn test_dedup_by_chunk_id_keeps_first() {
        let id = Uuid::new_v4();
        let meta = ChunkMetadata {
            document_id: Uuid::new_v4(),
            source_path: "a".into(),
            source_hash: "h".into(),
            document_title: None,
            document_type: DocumentType::Text,
            page_number: None,
            section_hierarchy: Vec::new(),
            paragraph_index: 0,
            chunk_index: 0,
            total_chunks: 1,
            content_type: ContentType::Paragraph,
            char_start: 0,
            char_end: 1,
            ingested_at: Utc::now(),
        };
        let results = vec![
            SearchResult {
                chunk_id: id,
                text: "first".into(),
                score: 0.9,
                metadata: meta.clone(),
            },
            SearchResult {
                chunk_id: id,
                text: "duplicate".into(),
                score: 0.8,
                metadata: meta,
            },
        ];
        let deduped = dedup_by_chunk_id(results);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].text, "first");
    }

    #[tokio::test]
    async fn test_generate_with_no_results() {
        let synthesizer = synthesizer_over(empty_store());
        let entry = synthesizer.generate("unknown subject", 10).await.unwrap();

        assert!(entry.sections.is_empty());
        assert!(entry.all_sources.is_empty());
        assert_eq!(entry.summary, NO_RESULTS_SUMMARY);
        assert_eq!(entry.query, "unknown subject");
    }

    #[tokio::test]
    async fn test_shared_heading_clusters_across_documents() {
        let store = empty_store();
        let doc_a = ingest_doc(
            &store,
            "atlas",
            &[(
                "Glaciers carve valleys slowly.",
                &["Introduction"] as &[&str],
            )],
        )
        .await;
        let doc_b = ingest_doc(
            &store,
            "survey",
            &[(
                "Glaciers retreat as climates warm.",
                &["Introduction"] as &[&str],
            )],
        )
        .await;

        let synthesizer = synthesizer_over(store);
        let entry = synthesizer.generate("glaciers", 10).await.unwrap();

        let intro: Vec<&WikiSection> = entry
            .sections
            .iter()
            .filter(|s| s.heading == "Introduction")
            .collect();
        assert_eq!(intro.len(), 1, "shared heading must merge into one section");

        let cited_docs: HashSet<Uuid> =
            entry.all_sources.iter().map(|s| s.document_id).collect();
        assert!(cited_docs.contains(&doc_a));
        assert!(cited_docs.contains(&doc_b));
    }

    #[tokio::test]
    async fn test_results_without_hierarchy_fall_into_overview() {
        let store = empty_store();
        ingest_doc(
            &store,
            "loose",
            &[("Tides follow the moon.", &[] as &[&str])],
        )
        .await;

        let synthesizer = synthesizer_over(store);
        let entry = synthesizer.generate("tides", 10).await.unwrap();

        assert_eq!(entry.sections.len(), 1);
        assert_eq!(entry.sections[0].heading, OVERVIEW_HEADING);
    }

    #[tokio::test]
    async fn test_small_subclusters_collapse_into_parent() {
        let store = empty_store();
        ingest_doc(
            &store,
            "deep",
            &[
                ("Basalt forms from cooling lava.", &["Geology", "Volcanic"] as &[&str]),
                ("Granite cooling happens slowly underground.", &["Geology"] as &[&str]),
            ],
        )
        .await;

        let synthesizer = synthesizer_over(store);
        let entry = synthesizer.generate("basalt granite cooling", 10).await.unwrap();

        let geology = entry
            .sections
            .iter()
            .find(|s| s.heading == "Geology")
            .expect("geology section");
        // A lone "Volcanic" member is below min_cluster_size and stays inline
        assert!(geology.subsections.is_empty());
        assert_eq!(geology.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_subclusters_form_subsections() {
        let store = empty_store();
        ingest_doc(
            &store,
            "layers",
            &[
                ("Rivers carry silt.", &["Geography", "Rivers"] as &[&str]),
                ("Rivers deposit silt.", &["Geography", "Rivers"] as &[&str]),
                ("Deserts expand.", &["Geography"] as &[&str]),
            ],
        )
        .await;

        let synthesizer = synthesizer_over(store);
        let entry = synthesizer
            .generate("rivers silt deserts", 10)
            .await
            .unwrap();

        let geography = entry
            .sections
            .iter()
            .find(|s| s.heading == "Geography")
            .expect("geography section");
        assert_eq!(geography.subsections.len(), 1);
        assert_eq!(geography.subsections[0].heading, "Rivers");
        assert_eq!(geography.subsections[0].sources.len(), 2);
    }

    #[tokio::test]
    async fn test_all_sources_first_appearance_order_and_dedup() {
        let store = empty_store();
        ingest_doc(
            &store,
            "ordered",
            &[
                ("Storms gather over warm seas.", &["Weather"] as &[&str]),
                ("Storms weaken over land.", &["Weather"] as &[&str]),
            ],
        )
        .await;

        let synthesizer = synthesizer_over(store);
        let entry = synthesizer.generate("storms", 10).await.unwrap();

        let ids: Vec<Uuid> = entry.all_sources.iter().map(|s| s.chunk_id).collect();
        let unique: HashSet<Uuid> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());

        // First listed source belongs to the first (highest-confidence) section
        let first_section_ids: Vec<Uuid> = entry.sections[0]
            .sources
            .iter()
            .map(|s| s.chunk_id)
            .collect();
        assert_eq!(ids[0], first_section_ids[0]);
    }

    #[tokio::test]
    async fn test_synthesize_section_empty_topic() {
        let synthesizer = synthesizer_over(empty_store());
        let section = synthesizer
            .synthesize_section("dark matter", None, 5)
            .await
            .unwrap();
        assert_eq!(section.heading, "dark matter");
        assert_eq!(section.confidence, 0.0);
        assert!(section.sources.is_empty());
    }

    #[tokio::test]
    async fn test_compare_groups_by_document() {
        let store = empty_store();
        ingest_doc(
            &store,
            "north",
            &[("Volcanoes shape the northern coast.", &[] as &[&str])],
        )
        .await;
        ingest_doc(
            &store,
            "south",
            &[("Volcanoes dot the southern range.", &[] as &[&str])],
        )
        .await;

        let synthesizer = synthesizer_over(store);
        let comparison = synthesizer.compare("volcanoes", 3).await.unwrap();

        assert_eq!(comparison.source_count, 2);
        assert!(comparison
            .sources
            .iter()
            .all(|s| !s.excerpts.is_empty()));
    }

    #[test]
    fn test_suggest_topics() {
        let documents = vec![Document {
            document_id: Uuid::new_v4(),
            source_path: "docs/atlas.pdf".into(),
            source_hash: "h".into(),
            title: Some("World Atlas".into()),
            document_type: DocumentType::Pdf,
            ingested_at: Utc::now(),
            sections: vec![
                chronicler_common::models::SectionRef {
                    hierarchy: vec!["Mountain Ranges".into()],
                    page_number: Some(4),
                },
                chronicler_common::models::SectionRef {
                    hierarchy: vec!["Maps".into()],
                    page_number: Some(9),
                },
            ],
            total_chunks: 10,
        }];

        let suggestions = suggest_topics(&documents, 10);
        assert!(suggestions.topics.contains(&"World Atlas".to_string()));
        assert!(suggestions.topics.contains(&"Mountain Ranges".to_string()));
        // "Maps" is too short to suggest
        assert!(!suggestions.topics.contains(&"Maps".to_string()));
        assert_eq!(suggestions.total, suggestions.topics.len());
    }

    #[test]
    fn test_merge_content_dedups_near_duplicates() {
        let meta = ChunkMetadata {
            document_id: Uuid::new_v4(),
            source_path: "a".into(),
            source_hash: "h".into(),
            document_title: None,
            document_type: DocumentType::Text,
            page_number: None,
            section_hierarchy: Vec::new(),
            paragraph_index: 0,
            chunk_index: 0,
            total_chunks: 2,
            content_type: ContentType::Paragraph,
            char_start: 0,
            char_end: 1,
            ingested_at: Utc::now(),
        };
        let results = vec![
            SearchResult {
                chunk_id: Uuid::new_v4(),
                text: "The same sentence.".into(),
                score: 0.9,
                metadata: meta.clone(),
            },
            SearchResult {
                chunk_id: Uuid::new_v4(),
                text: "the same sentence.".into(),
                score: 0.8,
                metadata: meta,
            },
        ];
        assert_eq!(merge_content(&results), "The same sentence.");
    }
}
