//! Two-level document chunking.
//!
//! Splits manual text into large parent chunks (the unit of context handed
//! to the generator) and small child chunks (the unit of vector search),
//! linked parent to child. Splitting is recursive over a priority-ordered
//! separator list, so chunk boundaries prefer paragraph breaks, then line
//! breaks, then sentence ends, then word gaps, falling back to a hard cut.
//!
//! `chunk_document` is a pure function of its inputs: identical text and
//! configuration produce byte-identical chunks with identical ids.

use uuid::Uuid;

use crate::core::config::ChunkingSettings;

/// Separator priority for recursive splitting. The empty string means a
/// hard cut at character boundaries.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Large text span delivered to the generator as context.
///
/// Parents of one document are non-overlapping and ordered; concatenating
/// them in `seq_index` order reconstructs the source text up to edge
/// whitespace trimmed from each parent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub seq_index: usize,
    pub children: Vec<ChildChunk>,
}

/// Small text span used for vector similarity search.
///
/// A child's content is a contiguous substring of its parent's content;
/// adjacent siblings share the configured overlap window.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildChunk {
    pub id: String,
    pub parent_id: String,
    pub content: String,
    pub seq_index: usize,
}

/// Splits `text` into parent chunks, each carrying its ordered child chunks.
///
/// Chunk ids are UUIDv5 values derived from the document id and sequence
/// index, so re-running ingestion for the same document version writes the
/// same rows.
pub fn chunk_document(
    document_id: &str,
    text: &str,
    config: &ChunkingSettings,
) -> Vec<ParentChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut fragments = Vec::new();
    split_recursive(
        text,
        config.parent_chunk_size,
        &DEFAULT_SEPARATORS,
        &mut fragments,
    );

    merge_fragments(&fragments, config.parent_chunk_size, 0)
        .into_iter()
        .map(|raw| raw.trim().to_string())
        .filter(|content| !content.is_empty())
        .enumerate()
        .map(|(seq_index, content)| {
            let id = derived_id(document_id, "parent", seq_index);
            let children = chunk_children(&id, &content, config);
            ParentChunk {
                id,
                document_id: document_id.to_string(),
                content,
                seq_index,
                children,
            }
        })
        .collect()
}

fn chunk_children(parent_id: &str, content: &str, config: &ChunkingSettings) -> Vec<ChildChunk> {
    let mut fragments = Vec::new();
    split_recursive(
        content,
        config.child_chunk_size,
        &DEFAULT_SEPARATORS,
        &mut fragments,
    );

    merge_fragments(
        &fragments,
        config.child_chunk_size,
        config.child_chunk_overlap,
    )
    .into_iter()
    .filter(|chunk| !chunk.trim().is_empty())
    .enumerate()
    .map(|(seq_index, content)| ChildChunk {
        id: derived_id(parent_id, "child", seq_index),
        parent_id: parent_id.to_string(),
        content,
        seq_index,
    })
    .collect()
}

fn derived_id(namespace: &str, kind: &str, seq_index: usize) -> String {
    let ns = Uuid::new_v5(&Uuid::NAMESPACE_OID, namespace.as_bytes());
    Uuid::new_v5(&ns, format!("{kind}:{seq_index}").as_bytes()).to_string()
}

/// Recursively splits `text` into fragments no longer than `target` chars,
/// trying separators in priority order. Separators stay attached to the
/// preceding fragment, so concatenating the fragments reproduces `text`
/// exactly. A fragment that no separator can break is emitted oversized
/// rather than dropped.
fn split_recursive<'a>(
    text: &'a str,
    target: usize,
    separators: &[&str],
    out: &mut Vec<&'a str>,
) {
    if text.is_empty() {
        return;
    }
    if char_len(text) <= target {
        out.push(text);
        return;
    }

    let Some((sep, rest)) = separators.split_first() else {
        out.push(text);
        return;
    };

    if sep.is_empty() {
        hard_cut(text, target, out);
        return;
    }

    let pieces = split_after_separator(text, sep);
    if pieces.len() == 1 {
        split_recursive(text, target, rest, out);
        return;
    }

    for piece in pieces {
        if char_len(piece) <= target {
            out.push(piece);
        } else {
            split_recursive(piece, target, rest, out);
        }
    }
}

/// Splits after each occurrence of `sep`, keeping the separator with the
/// preceding piece.
fn split_after_separator<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(sep) {
        let end = start + pos + sep.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    if pieces.is_empty() {
        pieces.push(text);
    }
    pieces
}

fn hard_cut<'a>(text: &'a str, target: usize, out: &mut Vec<&'a str>) {
    let target = target.max(1);
    let mut remaining = text;
    while !remaining.is_empty() {
        let end = remaining
            .char_indices()
            .nth(target)
            .map(|(idx, _)| idx)
            .unwrap_or(remaining.len());
        out.push(&remaining[..end]);
        remaining = &remaining[end..];
    }
}

/// Greedily merges fragments into chunks of at most `target` chars. On
/// flush, trailing fragments totaling at most `overlap` chars are retained
/// as the start of the next chunk. With `overlap == 0` the chunks form an
/// exact partition of the input.
fn merge_fragments(fragments: &[&str], target: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<&str> = Vec::new();
    let mut total = 0;

    for &fragment in fragments {
        let len = char_len(fragment);

        if total + len > target && !window.is_empty() {
            chunks.push(window.concat());
            while total > overlap || (total + len > target && total > 0) {
                total -= char_len(window.remove(0));
            }
        }

        window.push(fragment);
        total += len;
    }

    if !window.is_empty() {
        chunks.push(window.concat());
    }
    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(parent: usize, child: usize, overlap: usize) -> ChunkingSettings {
        ChunkingSettings {
            parent_chunk_size: parent,
            child_chunk_size: child,
            child_chunk_overlap: overlap,
        }
    }

    fn squash_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 200 sentences of 25 chars each: 5000 chars total.
    fn manual_text() -> String {
        (0..200)
            .map(|i| format!("Step {:03} cleans the fan. ", i))
            .collect()
    }

    #[test]
    fn short_document_yields_one_parent_one_child() {
        let parents = chunk_document("doc", "The quick brown fox.", &config(2000, 300, 50));
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].seq_index, 0);
        assert_eq!(parents[0].children.len(), 1);
        assert_eq!(parents[0].children[0].content, parents[0].content);
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        assert!(chunk_document("doc", "", &config(2000, 300, 50)).is_empty());
        assert!(chunk_document("doc", "  \n\n  ", &config(2000, 300, 50)).is_empty());
    }

    #[test]
    fn parents_reconstruct_source_text() {
        let text = manual_text();
        let parents = chunk_document("doc", &text, &config(2000, 300, 50));
        assert!(parents.len() > 1);

        let concatenated = parents
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(squash_whitespace(&concatenated), squash_whitespace(&text));

        for (idx, parent) in parents.iter().enumerate() {
            assert_eq!(parent.seq_index, idx);
        }
    }

    #[test]
    fn children_are_substrings_of_their_parent() {
        let text = manual_text();
        let parents = chunk_document("doc", &text, &config(2000, 300, 50));

        for parent in &parents {
            assert!(!parent.children.is_empty());
            for (idx, child) in parent.children.iter().enumerate() {
                assert_eq!(child.seq_index, idx);
                assert_eq!(child.parent_id, parent.id);
                assert!(
                    parent.content.contains(&child.content),
                    "child {} is not a substring of parent {}",
                    child.id,
                    parent.id
                );
            }
        }
    }

    #[test]
    fn adjacent_children_share_the_overlap_window() {
        let text = manual_text();
        let parents = chunk_document("doc", &text, &config(2000, 300, 50));

        // Sentences are 25 chars, so the 50-char overlap window carries the
        // previous child's last two sentences into the next child's start.
        let parent = &parents[0];
        for pair in parent.children.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].content.chars().collect();
                chars[chars.len().saturating_sub(50)..].iter().collect()
            };
            assert!(
                pair[1].content.starts_with(&tail),
                "next child does not start with previous child's overlap region"
            );
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = manual_text();
        let first = chunk_document("doc", &text, &config(2000, 300, 50));
        let second = chunk_document("doc", &text, &config(2000, 300, 50));
        assert_eq!(first, second);
    }

    #[test]
    fn different_documents_get_different_chunk_ids() {
        let first = chunk_document("doc-a", "Same text either way.", &config(2000, 300, 50));
        let second = chunk_document("doc-b", "Same text either way.", &config(2000, 300, 50));
        assert_ne!(first[0].id, second[0].id);
        assert_ne!(first[0].children[0].id, second[0].children[0].id);
    }

    #[test]
    fn five_thousand_chars_split_into_three_parents() {
        let text = manual_text();
        assert_eq!(text.chars().count(), 5000);

        let parents = chunk_document("doc", &text, &config(2000, 300, 50));
        assert_eq!(parents.len(), 3);

        // Full-size parents yield 7-10 children at the 300/50 settings.
        for parent in &parents[..2] {
            let count = parent.children.len();
            assert!(
                (7..=10).contains(&count),
                "expected 7-10 children, got {count}"
            );
        }
        assert!(!parents[2].children.is_empty());
    }

    #[test]
    fn no_separator_emits_oversized_fragment() {
        let unbroken = "x".repeat(40);
        let mut fragments = Vec::new();
        split_recursive(&unbroken, 10, &[". ", " "], &mut fragments);
        assert_eq!(fragments, vec![unbroken.as_str()]);
    }

    #[test]
    fn hard_cut_respects_char_boundaries() {
        let text = "京都の取扱説明書です。".repeat(10);
        let mut fragments = Vec::new();
        split_recursive(&text, 7, &[""], &mut fragments);
        assert_eq!(fragments.concat(), text);
        for fragment in &fragments {
            assert!(fragment.chars().count() <= 7);
        }
    }

    #[test]
    fn separators_are_preserved_by_splitting() {
        let text = "First line.\nSecond line.\n\nNew paragraph with several words in it.";
        let mut fragments = Vec::new();
        split_recursive(text, 12, &DEFAULT_SEPARATORS, &mut fragments);
        assert_eq!(fragments.concat(), text);
    }
}
