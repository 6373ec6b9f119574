use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a URL was classified for crawling (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlKind {
    SinglePage,
    TextFile,
    Sitemap,
    Recursive,
    Adaptive,
}

/// A single crawled markdown document, the unit produced by the dispatcher
/// and consumed by the chunker (spec.md §2, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub markdown: String,
    pub links: Vec<String>,
}

/// One contiguous slice of a crawled document (the `CrawledPage` entity,
/// spec.md §3). `chunk_number` is dense per `url` starting at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub url: String,
    pub chunk_number: i32,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
    pub source_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub headers: String,
    pub char_count: usize,
    pub word_count: usize,
    pub chunk_index: i32,
    pub url: String,
    pub source_id: String,
    pub crawl_time: DateTime<Utc>,
    pub contextual_embedding: bool,
    #[serde(default)]
    pub extracted_tables: Vec<String>,
}

/// A fenced code block extracted from a document (spec.md §3, §4.6). Only
/// produced when `USE_AGENTIC_RAG` is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExample {
    pub url: String,
    pub chunk_number: i32,
    pub code: String,
    pub summary: String,
    pub metadata: CodeExampleMetadata,
    pub embedding: Vec<f32>,
    pub source_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExampleMetadata {
    pub language: String,
    pub before_context: String,
    pub after_context: String,
    pub block_index: i32,
    pub char_count: usize,
    pub word_count: usize,
}

/// Logical grouping of chunks, typically one per hostname (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub source_id: String,
    pub summary: String,
    pub total_word_count: i64,
}

/// Per-document aggregate metadata stats (spec.md §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct AggregateStats {
    pub total_pages: usize,
    pub total_chars: usize,
    pub total_words: usize,
    pub avg_chars_per_page: f64,
    pub avg_words_per_page: f64,
    pub unique_urls: usize,
}

impl AggregateStats {
    pub fn compute(per_page_chars: &[usize], per_page_words: &[usize], unique_urls: usize) -> Self {
        let total_pages = per_page_chars.len();
        let total_chars: usize = per_page_chars.iter().sum();
        let total_words: usize = per_page_words.iter().sum();
        let avg_chars_per_page = if total_pages > 0 {
            total_chars as f64 / total_pages as f64
        } else {
            0.0
        };
        let avg_words_per_page = if total_pages > 0 {
            total_words as f64 / total_pages as f64
        } else {
            0.0
        };
        AggregateStats {
            total_pages,
            total_chars,
            total_words,
            avg_chars_per_page,
            avg_words_per_page,
            unique_urls,
        }
    }
}

/// One retrieved result from the hybrid retriever (spec.md §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub url: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub similarity: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_context: Option<Vec<GraphContextEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphContextEntry {
    pub entity_name: String,
    pub entity_type: EntityType,
    pub neighbors: Vec<EntityNeighbor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNeighbor {
    pub name: String,
    pub entity_type: EntityType,
    pub relation_type: String,
}

/// Entity type enumeration for the GraphRAG property graph (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Technology,
    Concept,
    Location,
    Event,
    Product,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: EntityType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRelation {
    pub from: String,
    pub to: String,
    pub relation_type: String,
    pub confidence: f32,
}

/// Extraction result for one chunk (spec.md §4.12).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphRagExtraction {
    pub entities: Vec<Entity>,
    pub relationships: Vec<EntityRelation>,
}

// ---------------------------------------------------------------------------
// Code graph (property graph) types, spec.md §3 / §4.10
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoFile {
    pub path: String,
    pub repo_name: String,
    pub imports: Vec<String>,
    pub classes: Vec<ClassDef>,
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub full_name: String,
    pub methods: Vec<MethodDef>,
    pub attributes: Vec<AttributeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub full_name: String,
    pub params_list: Vec<String>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub full_name: String,
    pub attr_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub full_name: String,
    pub params_list: Vec<String>,
    pub return_type: Option<String>,
}

/// Statistics returned from a repository parse (spec.md §4.10 step 5).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParseStats {
    pub files_processed: usize,
    pub classes_created: usize,
    pub methods_created: usize,
    pub functions_created: usize,
    pub attributes_created: usize,
}

impl std::ops::AddAssign for ParseStats {
    fn add_assign(&mut self, rhs: Self) {
        self.files_processed += rhs.files_processed;
        self.classes_created += rhs.classes_created;
        self.methods_created += rhs.methods_created;
        self.functions_created += rhs.functions_created;
        self.attributes_created += rhs.attributes_created;
    }
}

/// Hallucination validator classification (spec.md §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseValidity {
    Valid,
    Uncertain,
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolUseReport {
    pub kind: SymbolUseKind,
    pub symbol: String,
    pub context: String,
    pub validity: UseValidity,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolUseKind {
    Import,
    ClassInstantiation,
    FunctionCall,
    MethodCall,
    AttributeAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallucinationReport {
    pub uses: Vec<SymbolUseReport>,
    pub overall_confidence: f32,
}

impl HallucinationReport {
    pub fn from_uses(uses: Vec<SymbolUseReport>) -> Self {
        let total = uses.len();
        let invalid = uses
            .iter()
            .filter(|u| u.validity == UseValidity::Invalid)
            .count();
        let overall_confidence = if total == 0 {
            1.0
        } else {
            (1.0 - invalid as f32 / total as f32).clamp(0.0, 1.0)
        };
        HallucinationReport {
            uses,
            overall_confidence,
        }
    }
}

/// Per-URL crawl statistics, reported back through the tool-call surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_crawled: usize,
    pub chunks_stored: usize,
    pub code_examples_stored: usize,
}

/// Memory-adaptive dispatcher run statistics (spec.md §4.2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub start_mb: f64,
    pub end_mb: f64,
    pub peak_mb: f64,
    pub avg_mb: f64,
    pub elapsed_s: f64,
}

/// Adaptive crawl strategy discipline (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveStrategy {
    BestFirst,
    Bfs,
    Dfs,
}

impl Default for AdaptiveStrategy {
    fn default() -> Self {
        AdaptiveStrategy::BestFirst
    }
}

pub type MetadataMap = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_stats_averages_are_zero_on_empty_input() {
        let stats = AggregateStats::compute(&[], &[], 0);
        assert_eq!(stats.total_pages, 0);
        assert_eq!(stats.avg_chars_per_page, 0.0);
        assert_eq!(stats.avg_words_per_page, 0.0);
    }

    #[test]
    fn aggregate_stats_averages_per_page() {
        let stats = AggregateStats::compute(&[100, 200], &[20, 40], 2);
        assert_eq!(stats.total_chars, 300);
        assert_eq!(stats.avg_chars_per_page, 150.0);
        assert_eq!(stats.avg_words_per_page, 30.0);
    }

    #[test]
    fn hallucination_confidence_is_one_with_no_uses() {
        let report = HallucinationReport::from_uses(vec![]);
        assert_eq!(report.overall_confidence, 1.0);
    }

    #[test]
    fn hallucination_confidence_reflects_invalid_ratio() {
        let uses = vec![
            SymbolUseReport {
                kind: SymbolUseKind::FunctionCall,
                symbol: "foo".into(),
                context: "foo()".into(),
                validity: UseValidity::Valid,
                reason: "found in graph".into(),
            },
            SymbolUseReport {
                kind: SymbolUseKind::MethodCall,
                symbol: "bar.baz".into(),
                context: "bar.baz()".into(),
                validity: UseValidity::Invalid,
                reason: "no such method".into(),
            },
        ];
        let report = HallucinationReport::from_uses(uses);
        assert_eq!(report.overall_confidence, 0.5);
    }
}
