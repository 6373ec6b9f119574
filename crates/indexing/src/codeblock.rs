//! Code-block extractor (spec.md §4.6): scans markdown for fenced blocks at
//! or above a minimum length, recording language, surrounding context, and
//! an LLM-generated summary.

use ragsmith_common::CodeExampleMetadata;

use crate::contextual::ChatClient;

const CONTEXT_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct ExtractedCodeBlock {
    pub code: String,
    pub language: String,
    pub before_context: String,
    pub after_context: String,
    pub block_index: i32,
}

/// Find every fenced code block of length `>= min_len` chars, in document
/// order.
pub fn extract_code_blocks(markdown: &str, min_len: usize) -> Vec<ExtractedCodeBlock> {
    let mut blocks = Vec::new();
    let mut search_from = 0usize;
    let mut block_index = 0i32;

    while let Some(rel_open) = markdown[search_from..].find("```") {
        let open_fence = search_from + rel_open;
        let lang_start = open_fence + 3;
        let Some(rel_newline) = markdown[lang_start..].find('\n') else {
            break;
        };
        let language = markdown[lang_start..lang_start + rel_newline].trim().to_string();
        let code_start = lang_start + rel_newline + 1;

        let Some(rel_close) = markdown[code_start..].find("```") else {
            break;
        };
        let code_end = code_start + rel_close;
        let code = markdown[code_start..code_end].to_string();
        let after_fence_end = code_end + 3;

        if code.len() >= min_len {
            let before_start = open_fence.saturating_sub(CONTEXT_CHARS);
            let before_start = floor_char_boundary(markdown, before_start);
            let before_context = markdown[before_start..open_fence].to_string();

            let after_end = (after_fence_end + CONTEXT_CHARS).min(markdown.len());
            let after_end = floor_char_boundary(markdown, after_end);
            let after_context = markdown[after_fence_end..after_end].to_string();

            blocks.push(ExtractedCodeBlock {
                code,
                language,
                before_context,
                after_context,
                block_index,
            });
            block_index += 1;
        }

        search_from = after_fence_end;
    }

    blocks
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Generate a 2-3 sentence summary for a code block, given its surrounding
/// context. Not a soft-fail seam like the contextual summarizer — a missing
/// summary here means the code example's embedding text would be
/// incomplete, so callers should surface the error rather than index a
/// summary-less example silently.
/// On LLM failure, falls back to the block's own code rather than aborting
/// ingest, matching `summarize_chunk_in_document`'s failure mode (spec.md
/// §4.5, §4.6).
pub async fn summarize_code_block(client: &dyn ChatClient, block: &ExtractedCodeBlock) -> String {
    let prompt = format!(
        "Context before:\n{}\n\nCode ({}):\n{}\n\nContext after:\n{}\n\n\
         Give a 2-3 sentence summary of what this code example demonstrates.",
        block.before_context, block.language, block.code, block.after_context
    );
    match client.complete("You summarize code examples concisely.", &prompt).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(error = %e, "code block summarization failed, falling back to raw code");
            block.code.clone()
        }
    }
}

/// Build the `CodeExampleMetadata` for a block (spec.md §3).
pub fn code_example_metadata(block: &ExtractedCodeBlock) -> CodeExampleMetadata {
    CodeExampleMetadata {
        language: block.language.clone(),
        before_context: block.before_context.clone(),
        after_context: block.after_context.clone(),
        block_index: block.block_index,
        char_count: block.code.chars().count(),
        word_count: block.code.split_whitespace().count(),
    }
}

/// Embedding input is `code + "\n\nSummary: " + summary` (spec.md §3).
pub fn embedding_input(code: &str, summary: &str) -> String {
    format!("{code}\n\nSummary: {summary}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_block_above_min_length_with_language() {
        let code = "x".repeat(310);
        let markdown = format!("intro\n```rust\n{code}\n```\nafter text");
        let blocks = extract_code_blocks(&markdown, 300);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "rust");
        assert_eq!(blocks[0].code, code);
        assert!(blocks[0].before_context.contains("intro"));
        assert!(blocks[0].after_context.contains("after text"));
    }

    #[test]
    fn skips_blocks_below_min_length() {
        let markdown = "```rust\nfn x() {}\n```";
        let blocks = extract_code_blocks(markdown, 300);
        assert!(blocks.is_empty());
    }

    #[test]
    fn block_index_is_ordinal_within_document() {
        let block_a = "a".repeat(300);
        let block_b = "b".repeat(300);
        let markdown = format!("```rust\n{block_a}\n```\nmiddle\n```python\n{block_b}\n```");
        let blocks = extract_code_blocks(&markdown, 300);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_index, 0);
        assert_eq!(blocks[1].block_index, 1);
        assert_eq!(blocks[1].language, "python");
    }

    #[test]
    fn embedding_input_appends_summary_marker() {
        assert_eq!(embedding_input("code", "does x"), "code\n\nSummary: does x");
    }

    struct FailingClient;

    #[async_trait::async_trait]
    impl ChatClient for FailingClient {
        async fn complete(&self, _system: &str, _prompt: &str) -> ragsmith_common::Result<String> {
            Err(ragsmith_common::EngineError::Unknown("boom".into()))
        }
    }

    #[tokio::test]
    async fn summarize_code_block_falls_back_to_raw_code_on_failure() {
        let block = ExtractedCodeBlock {
            code: "fn x() {}".to_string(),
            language: "rust".to_string(),
            before_context: String::new(),
            after_context: String::new(),
            block_index: 0,
        };
        let summary = summarize_code_block(&FailingClient, &block).await;
        assert_eq!(summary, "fn x() {}");
    }
}
