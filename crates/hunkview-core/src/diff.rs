//! Line and word diff collaborators
//!
//! The engine never diffs text itself. It consumes two opaque functions:
//! a line diff over whole files and a whitespace-preserving word diff over a
//! single pair of lines. Both return ordered chunks from which the old text
//! (non-added chunks) and the new text (non-removed chunks) reconstruct
//! exactly.

use imara_diff::{Algorithm, Diff, InternedInput};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::ops::Range;

/// One run of a diff result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffChunk {
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub added: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
}

impl DiffChunk {
    pub fn equal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            added: false,
            removed: false,
        }
    }

    pub fn added(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            added: true,
            removed: false,
        }
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            added: false,
            removed: true,
        }
    }

    /// True for added or removed chunks
    pub fn is_change(&self) -> bool {
        self.added || self.removed
    }
}

/// Rebuild the old text from a chunk list (every chunk that was not added)
pub fn reconstruct_old(chunks: &[DiffChunk]) -> String {
    chunks
        .iter()
        .filter(|c| !c.added)
        .map(|c| c.value.as_str())
        .collect()
}

/// Rebuild the new text from a chunk list (every chunk that was not removed)
pub fn reconstruct_new(chunks: &[DiffChunk]) -> String {
    chunks
        .iter()
        .filter(|c| !c.removed)
        .map(|c| c.value.as_str())
        .collect()
}

/// Line-level diff over full file contents
pub trait LineDiff {
    fn diff_lines(&self, old: &str, new: &str) -> Vec<DiffChunk>;
}

/// Word-level diff over one pair of lines.
///
/// Implementations must keep whitespace as its own content: a diff that
/// collapses or drops whitespace breaks the fragment reconstruction the
/// renderer relies on.
pub trait WordDiff {
    fn diff_words(&self, old: &str, new: &str) -> Vec<DiffChunk>;
}

impl<F> LineDiff for F
where
    F: Fn(&str, &str) -> Vec<DiffChunk>,
{
    fn diff_lines(&self, old: &str, new: &str) -> Vec<DiffChunk> {
        self(old, new)
    }
}

/// Line diff backed by imara-diff
#[derive(Debug, Clone, Copy)]
pub struct ImaraLineDiff {
    algorithm: Algorithm,
}

impl Default for ImaraLineDiff {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Histogram,
        }
    }
}

impl ImaraLineDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

impl LineDiff for ImaraLineDiff {
    fn diff_lines(&self, old: &str, new: &str) -> Vec<DiffChunk> {
        let input = InternedInput::new(old, new);
        let mut diff = Diff::compute(self.algorithm, &input);
        diff.postprocess_lines(&input);

        // Line values keep their terminators so chunk values concatenate back
        // into the original texts.
        let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
        let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

        let mut chunks = Vec::new();
        let mut pos = 0usize;
        for hunk in diff.hunks() {
            let before = hunk.before.start as usize..hunk.before.end as usize;
            let after = hunk.after.start as usize..hunk.after.end as usize;
            push_run(&mut chunks, &old_lines, pos..before.start, DiffChunk::equal);
            push_run(&mut chunks, &old_lines, before.clone(), DiffChunk::removed);
            push_run(&mut chunks, &new_lines, after, DiffChunk::added);
            pos = before.end;
        }
        push_run(&mut chunks, &old_lines, pos..old_lines.len(), DiffChunk::equal);
        chunks
    }
}

fn push_run(
    chunks: &mut Vec<DiffChunk>,
    lines: &[&str],
    range: Range<usize>,
    make: fn(String) -> DiffChunk,
) {
    let end = range.end.min(lines.len());
    let start = range.start.min(end);
    if start == end {
        return;
    }
    chunks.push(make(lines[start..end].concat()));
}

/// Whitespace-preserving word diff backed by `similar`.
///
/// `TextDiff::from_words` tokenizes into alternating word and whitespace runs,
/// so every byte of both lines lands in some change.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarWordDiff;

impl WordDiff for SimilarWordDiff {
    fn diff_words(&self, old: &str, new: &str) -> Vec<DiffChunk> {
        let diff = TextDiff::from_words(old, new);
        let mut chunks: Vec<DiffChunk> = Vec::new();

        for change in diff.iter_all_changes() {
            let (added, removed) = match change.tag() {
                ChangeTag::Equal => (false, false),
                ChangeTag::Delete => (false, true),
                ChangeTag::Insert => (true, false),
            };
            let value = change.value();
            match chunks.last_mut() {
                Some(last) if last.added == added && last.removed == removed => {
                    last.value.push_str(value);
                }
                _ => chunks.push(DiffChunk {
                    value: value.to_string(),
                    added,
                    removed,
                }),
            }
        }

        chunks
    }
}
