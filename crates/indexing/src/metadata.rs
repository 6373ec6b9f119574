//! Metadata extractor (spec.md §4.4): per-chunk header/char/word counts and
//! per-document aggregate stats.

use chrono::Utc;
use ragsmith_common::{AggregateStats, ChunkMetadata};

/// Extract `headers` (all `#`-prefixed lines joined with `"; "`), char count,
/// and word count for one chunk.
pub fn extract_chunk_metadata(
    content: &str,
    url: &str,
    source_id: &str,
    chunk_index: i32,
    contextual_embedding: bool,
) -> ChunkMetadata {
    let headers = content
        .lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("; ");

    ChunkMetadata {
        headers,
        char_count: content.chars().count(),
        word_count: content.split_whitespace().count(),
        chunk_index,
        url: url.to_string(),
        source_id: source_id.to_string(),
        crawl_time: Utc::now(),
        contextual_embedding,
        extracted_tables: extract_tables(content),
    }
}

/// Pull out GFM-style pipe tables verbatim, each as one string, so callers
/// can surface them separately from prose content if they want to.
fn extract_tables(content: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 1 {
            current.push(line);
        } else if !current.is_empty() {
            if current.len() >= 2 {
                tables.push(current.join("\n"));
            }
            current.clear();
        }
    }
    if current.len() >= 2 {
        tables.push(current.join("\n"));
    }
    tables
}

/// Aggregate per-document stats across all pages of a crawl (spec.md §4.4).
pub fn aggregate_stats(per_page_chars: &[usize], per_page_words: &[usize], unique_urls: usize) -> AggregateStats {
    AggregateStats::compute(per_page_chars, per_page_words, unique_urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_joined_with_semicolons() {
        let content = "# Title\n\nBody text\n## Subtitle\nMore text";
        let meta = extract_chunk_metadata(content, "https://x.test/a", "x.test", 0, false);
        assert_eq!(meta.headers, "# Title; ## Subtitle");
    }

    #[test]
    fn char_and_word_counts_are_correct() {
        let meta = extract_chunk_metadata("hello world", "https://x.test/a", "x.test", 0, false);
        assert_eq!(meta.char_count, 11);
        assert_eq!(meta.word_count, 2);
    }

    #[test]
    fn extracts_pipe_tables() {
        let content = "intro\n| a | b |\n| - | - |\n| 1 | 2 |\noutro";
        let meta = extract_chunk_metadata(content, "https://x.test/a", "x.test", 0, false);
        assert_eq!(meta.extracted_tables.len(), 1);
        assert!(meta.extracted_tables[0].contains("| 1 | 2 |"));
    }

    #[test]
    fn no_headers_yields_empty_string() {
        let meta = extract_chunk_metadata("plain text only", "https://x.test/a", "x.test", 0, false);
        assert_eq!(meta.headers, "");
    }
}
