//! Chunker (spec.md §4.3): splits markdown into ordered, non-overlapping
//! chunks of at most `target_size` chars, greedily from the start, preferring
//! splits at (in order) the end of a fenced code block, a paragraph break,
//! then a sentence boundary.

/// Split `markdown` into chunks of at most `target_size` chars.
pub fn chunk_markdown(markdown: &str, target_size: usize) -> Vec<String> {
    if markdown.is_empty() || target_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = markdown;

    while !remaining.is_empty() {
        if remaining.len() <= target_size {
            chunks.push(remaining.to_string());
            break;
        }

        let window = &remaining[..target_size];
        let split_at = find_code_fence_boundary(window)
            .or_else(|| find_paragraph_boundary(window))
            .or_else(|| find_sentence_boundary(window))
            .unwrap_or(target_size);

        let split_at = split_at.max(1);
        let (head, tail) = remaining.split_at(floor_char_boundary(remaining, split_at));
        chunks.push(head.to_string());
        remaining = tail;
    }

    chunks
}

/// `str::split_at` requires a char boundary; walk back from `idx` to the
/// nearest one so we never panic on multi-byte UTF-8 input.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Last occurrence of a closing code fence within `window`, split point just
/// after the fence line.
fn find_code_fence_boundary(window: &str) -> Option<usize> {
    let last_fence = window.rmatch_indices("```").next()?;
    let fence_start = last_fence.0;
    // Only a *closing* fence counts — i.e. there must be an opening fence
    // earlier in the window (an odd total count up to this point would mean
    // this fence itself opens a block we'd be splitting mid-block).
    let fences_before = window[..fence_start].matches("```").count();
    if fences_before % 2 != 1 {
        return None;
    }
    let after_fence = fence_start + 3;
    let line_end = window[after_fence..].find('\n').map(|i| after_fence + i + 1).unwrap_or(window.len());
    Some(line_end)
}

fn find_paragraph_boundary(window: &str) -> Option<usize> {
    window.rfind("\n\n").map(|idx| idx + 2)
}

fn find_sentence_boundary(window: &str) -> Option<usize> {
    window.rfind(". ").map(|idx| idx + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_markdown_yields_zero_chunks() {
        assert_eq!(chunk_markdown("", 5000), Vec::<String>::new());
    }

    #[test]
    fn short_markdown_is_a_single_chunk() {
        let md = "# Title\n\nHello world.";
        assert_eq!(chunk_markdown(md, 5000), vec![md.to_string()]);
    }

    #[test]
    fn no_chunk_exceeds_target_size() {
        let md = "word ".repeat(2000);
        let chunks = chunk_markdown(&md, 100);
        assert!(chunks.iter().all(|c| c.len() <= 100));
        assert_eq!(chunks.concat(), md);
    }

    #[test]
    fn prefers_paragraph_boundary_over_mid_word_split() {
        let para1 = "a".repeat(40);
        let para2 = "b".repeat(40);
        let md = format!("{para1}\n\n{para2}");
        let chunks = chunk_markdown(&md, 45);
        assert_eq!(chunks[0], format!("{para1}\n\n"));
    }

    #[test]
    fn splits_after_closing_code_fence() {
        let md = format!("intro text here\n```rust\nfn x() {{}}\n```\n{}", "tail ".repeat(20));
        let chunks = chunk_markdown(&md, md.len() - 5);
        assert!(chunks[0].trim_end().ends_with("```"));
    }

    #[test]
    fn reassembly_reproduces_the_original() {
        let md = "Some intro.\n\nSecond paragraph with more content that goes on for a while to force a split eventually maybe.";
        let chunks = chunk_markdown(md, 40);
        assert_eq!(chunks.concat(), md);
    }
}
