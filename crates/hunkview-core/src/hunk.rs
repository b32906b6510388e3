//! Hunks and raw-text normalization

use crate::diff::{ImaraLineDiff, LineDiff};
use serde::Serialize;

/// Role of a single hunk line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

impl LineKind {
    pub fn prefix(self) -> char {
        match self {
            LineKind::Added => '+',
            LineKind::Removed => '-',
            LineKind::Context => ' ',
        }
    }

    /// Split a prefixed hunk line into its kind and text.
    ///
    /// A line without a recognised prefix is context, and its whole text is
    /// the content.
    pub fn split(line: &str) -> (LineKind, &str) {
        match line.as_bytes().first() {
            Some(b'+') => (LineKind::Added, &line[1..]),
            Some(b'-') => (LineKind::Removed, &line[1..]),
            Some(b' ') => (LineKind::Context, &line[1..]),
            _ => (LineKind::Context, line),
        }
    }
}

/// A contiguous block of a patch.
///
/// `lines` holds prefixed strings (`'+'`, `'-'`, `' '` followed by the text).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Hunk {
    /// 1-based first line in the old file
    pub old_start: usize,
    pub old_lines: usize,
    /// 1-based first line in the new file
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<String>,
}

impl Hunk {
    pub fn new(old_start: usize, new_start: usize) -> Self {
        Self {
            old_start,
            new_start,
            ..Self::default()
        }
    }

    /// Append a line and keep the per-side counters in step
    pub fn push_line(&mut self, kind: LineKind, text: &str) {
        match kind {
            LineKind::Context => {
                self.old_lines += 1;
                self.new_lines += 1;
            }
            LineKind::Added => self.new_lines += 1,
            LineKind::Removed => self.old_lines += 1,
        }
        let mut line = String::with_capacity(text.len() + 1);
        line.push(kind.prefix());
        line.push_str(text);
        self.lines.push(line);
    }

    /// First old-file line after this hunk (1-based)
    pub fn old_end(&self) -> usize {
        self.old_start + self.old_lines
    }

    /// First new-file line after this hunk (1-based)
    pub fn new_end(&self) -> usize {
        self.new_start + self.new_lines
    }

    /// Unified diff header, e.g. `@@ -4,2 +4,3 @@`
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_lines, self.new_start, self.new_lines
        )
    }

    /// Iterate the lines as (kind, text) pairs
    pub fn iter_lines(&self) -> impl Iterator<Item = (LineKind, &str)> + '_ {
        self.lines.iter().map(|line| LineKind::split(line))
    }

    pub fn additions(&self) -> usize {
        self.iter_lines().filter(|(k, _)| *k == LineKind::Added).count()
    }

    pub fn deletions(&self) -> usize {
        self.iter_lines()
            .filter(|(k, _)| *k == LineKind::Removed)
            .count()
    }
}

/// Build a single normalized hunk from two full texts using the default
/// line diff
pub fn raw_diff_to_hunks(old_text: &str, new_text: &str) -> Vec<Hunk> {
    raw_diff_to_hunks_with(&ImaraLineDiff::default(), old_text, new_text)
}

/// Build a single normalized hunk from two full texts.
///
/// Every chunk of the line diff loses exactly one trailing newline and is
/// split on `\n`; the whole file becomes one hunk starting at line 1 on both
/// sides.
pub fn raw_diff_to_hunks_with<D>(line_diff: &D, old_text: &str, new_text: &str) -> Vec<Hunk>
where
    D: LineDiff + ?Sized,
{
    let mut hunk = Hunk::new(1, 1);

    for chunk in line_diff.diff_lines(old_text, new_text) {
        if chunk.value.is_empty() {
            continue;
        }
        let kind = if chunk.added {
            LineKind::Added
        } else if chunk.removed {
            LineKind::Removed
        } else {
            LineKind::Context
        };
        let body = chunk.value.strip_suffix('\n').unwrap_or(&chunk.value);
        for line in body.split('\n') {
            hunk.push_line(kind, line);
        }
    }

    vec![hunk]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffChunk;

    #[test]
    fn test_raw_diff_preserves_leading_whitespace() {
        let hunks = raw_diff_to_hunks("    const x = 1;\n", "    const y = 2;\n");
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert!(hunk.lines.contains(&"-    const x = 1;".to_string()));
        assert!(hunk.lines.contains(&"+    const y = 2;".to_string()));
        assert_eq!((hunk.old_start, hunk.new_start), (1, 1));
        assert_eq!((hunk.old_lines, hunk.new_lines), (1, 1));
    }

    #[test]
    fn test_raw_diff_equal_inputs_are_context_only() {
        let text = "a\nb\nc\n";
        let hunks = raw_diff_to_hunks(text, text);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines, vec![" a", " b", " c"]);
        assert_eq!((hunks[0].old_lines, hunks[0].new_lines), (3, 3));
    }

    #[test]
    fn test_raw_diff_counters() {
        let fake = |_: &str, _: &str| {
            vec![
                DiffChunk::equal("keep\n"),
                DiffChunk::removed("gone 1\ngone 2\n"),
                DiffChunk::added("new\n"),
                DiffChunk::equal("tail"),
            ]
        };
        let hunks = raw_diff_to_hunks_with(&fake, "", "");
        let hunk = &hunks[0];
        assert_eq!(
            hunk.lines,
            vec![" keep", "-gone 1", "-gone 2", "+new", " tail"]
        );
        assert_eq!(hunk.old_lines, 4);
        assert_eq!(hunk.new_lines, 3);
    }

    #[test]
    fn test_raw_diff_strips_only_one_newline() {
        let fake = |_: &str, _: &str| vec![DiffChunk::added("x\n\n")];
        let hunks = raw_diff_to_hunks_with(&fake, "", "");
        assert_eq!(hunks[0].lines, vec!["+x", "+"]);
    }

    #[test]
    fn test_line_kind_split_defaults_to_context() {
        assert_eq!(LineKind::split("+a"), (LineKind::Added, "a"));
        assert_eq!(LineKind::split("-"), (LineKind::Removed, ""));
        assert_eq!(LineKind::split(" b"), (LineKind::Context, "b"));
        assert_eq!(LineKind::split("noprefix"), (LineKind::Context, "noprefix"));
        assert_eq!(LineKind::split(""), (LineKind::Context, ""));
    }

    #[test]
    fn test_header_and_stats() {
        let mut hunk = Hunk::new(4, 5);
        hunk.push_line(LineKind::Context, "a");
        hunk.push_line(LineKind::Removed, "b");
        hunk.push_line(LineKind::Added, "c");
        hunk.push_line(LineKind::Added, "d");
        assert_eq!(hunk.header(), "@@ -4,2 +5,3 @@");
        assert_eq!(hunk.additions(), 2);
        assert_eq!(hunk.deletions(), 1);
        assert_eq!(hunk.old_end(), 6);
        assert_eq!(hunk.new_end(), 8);
    }
}
