//! Display-line model built from hunks
//!
//! Both layouts come from one walk over the hunks. The walk keeps a cursor per
//! side into the token streams (each side's lines concatenated across hunks),
//! so the `n`th old-side line of the diff always reads the `n`th old token
//! line no matter which hunk it sits in.

use crate::diff::WordDiff;
use crate::fuse::{fuse_line, fuse_segments, Fragment, Side};
use crate::group::HunkTagged;
use crate::hunk::{Hunk, LineKind};
use crate::token::Tokens;
use serde::Serialize;

/// One row of the unified layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLineEntry {
    pub old_num: Option<usize>,
    pub new_num: Option<usize>,
    pub prefix: char,
    pub content: Vec<Fragment>,
    pub kind: LineKind,
    pub hunk_index: usize,
}

/// Role of a cell in the split layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    Removed,
    Added,
    Context,
    /// Placeholder opposite an unpaired line
    Empty,
}

/// One cell of the split layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitLineEntry {
    pub content: Vec<Fragment>,
    pub kind: SplitKind,
    pub num: Option<usize>,
    pub hunk_index: usize,
}

impl SplitLineEntry {
    fn empty(hunk_index: usize) -> Self {
        Self {
            content: Vec::new(),
            kind: SplitKind::Empty,
            num: None,
            hunk_index,
        }
    }
}

/// Left and right columns, always the same length
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitLines {
    pub left: Vec<SplitLineEntry>,
    pub right: Vec<SplitLineEntry>,
}

/// A left/right pair at the same height
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitRow {
    pub left: SplitLineEntry,
    pub right: SplitLineEntry,
}

impl SplitLines {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn into_rows(self) -> Vec<SplitRow> {
        self.left
            .into_iter()
            .zip(self.right)
            .map(|(left, right)| SplitRow { left, right })
            .collect()
    }
}

impl HunkTagged for DiffLineEntry {
    fn hunk_index(&self) -> usize {
        self.hunk_index
    }
}

impl HunkTagged for SplitLineEntry {
    fn hunk_index(&self) -> usize {
        self.hunk_index
    }
}

impl HunkTagged for SplitRow {
    fn hunk_index(&self) -> usize {
        self.left.hunk_index
    }
}

/// A numbered, rendered line of one side
struct SideLine {
    num: usize,
    content: Vec<Fragment>,
}

enum Event {
    Context {
        hunk_index: usize,
        old_num: usize,
        new_num: usize,
        old: Vec<Fragment>,
        new: Vec<Fragment>,
    },
    /// Removed lines then added lines; the first `min(len)` of each are
    /// word-diffed against each other
    Change {
        hunk_index: usize,
        removed: Vec<SideLine>,
        added: Vec<SideLine>,
    },
}

struct Walker<'a, W: ?Sized> {
    old_tokens: Tokens<'a>,
    new_tokens: Tokens<'a>,
    word_diff: &'a W,
    old_idx: usize,
    new_idx: usize,
}

impl<'a, W: WordDiff + ?Sized> Walker<'a, W> {
    fn new(old_tokens: Tokens<'a>, new_tokens: Tokens<'a>, word_diff: &'a W) -> Self {
        Self {
            old_tokens,
            new_tokens,
            word_diff,
            old_idx: 0,
            new_idx: 0,
        }
    }

    fn walk(&mut self, hunks: &[Hunk]) -> Vec<Event> {
        let mut events = Vec::new();
        for (hunk_index, hunk) in hunks.iter().enumerate() {
            self.walk_hunk(hunk_index, hunk, &mut events);
        }
        events
    }

    fn walk_hunk(&mut self, hunk_index: usize, hunk: &Hunk, events: &mut Vec<Event>) {
        let lines: Vec<(LineKind, &str)> = hunk.iter_lines().collect();
        let mut old_num = hunk.old_start;
        let mut new_num = hunk.new_start;
        let mut i = 0usize;

        while i < lines.len() {
            let (kind, text) = lines[i];
            if kind == LineKind::Context {
                events.push(Event::Context {
                    hunk_index,
                    old_num,
                    new_num,
                    old: fuse_line(text, self.old_tokens.line(self.old_idx)),
                    new: fuse_line(text, self.new_tokens.line(self.new_idx)),
                });
                self.old_idx += 1;
                self.new_idx += 1;
                old_num += 1;
                new_num += 1;
                i += 1;
                continue;
            }

            let removed_start = i;
            while i < lines.len() && lines[i].0 == LineKind::Removed {
                i += 1;
            }
            let added_start = i;
            while i < lines.len() && lines[i].0 == LineKind::Added {
                i += 1;
            }

            let removed: Vec<&str> = lines[removed_start..added_start]
                .iter()
                .map(|l| l.1)
                .collect();
            let added: Vec<&str> = lines[added_start..i].iter().map(|l| l.1).collect();
            let (removed, added) = self.render_change(&removed, &added, old_num, new_num);
            old_num += removed.len();
            new_num += added.len();
            events.push(Event::Change {
                hunk_index,
                removed,
                added,
            });
        }
    }

    fn render_change(
        &mut self,
        removed: &[&str],
        added: &[&str],
        old_num: usize,
        new_num: usize,
    ) -> (Vec<SideLine>, Vec<SideLine>) {
        let paired = removed.len().min(added.len());
        let segments: Vec<_> = (0..paired)
            .map(|k| self.word_diff.diff_words(removed[k], added[k]))
            .collect();

        let removed_lines = removed
            .iter()
            .enumerate()
            .map(|(k, text)| {
                let tokens = self.old_tokens.line(self.old_idx + k);
                let content = match segments.get(k) {
                    Some(segs) => fuse_segments(segs, tokens, Side::Old),
                    None => fuse_line(text, tokens),
                };
                SideLine {
                    num: old_num + k,
                    content,
                }
            })
            .collect();

        let added_lines = added
            .iter()
            .enumerate()
            .map(|(k, text)| {
                let tokens = self.new_tokens.line(self.new_idx + k);
                let content = match segments.get(k) {
                    Some(segs) => fuse_segments(segs, tokens, Side::New),
                    None => fuse_line(text, tokens),
                };
                SideLine {
                    num: new_num + k,
                    content,
                }
            })
            .collect();

        self.old_idx += removed.len();
        self.new_idx += added.len();
        (removed_lines, added_lines)
    }
}

fn has_style(fragments: &[Fragment]) -> bool {
    fragments.iter().any(|f| f.style.is_some())
}

/// Build the unified (single-column) line list.
///
/// Within a change group every removed line precedes every added line.
pub fn build_unified<W: WordDiff + ?Sized>(
    hunks: &[Hunk],
    old_tokens: Tokens<'_>,
    new_tokens: Tokens<'_>,
    word_diff: &W,
) -> Vec<DiffLineEntry> {
    let mut out = Vec::new();
    for event in Walker::new(old_tokens, new_tokens, word_diff).walk(hunks) {
        match event {
            Event::Context {
                hunk_index,
                old_num,
                new_num,
                old,
                new,
            } => {
                // Prefer the new side's colors; fall back to old when only
                // the old stream arrived
                let content = if has_style(&new) || !has_style(&old) {
                    new
                } else {
                    old
                };
                out.push(DiffLineEntry {
                    old_num: Some(old_num),
                    new_num: Some(new_num),
                    prefix: LineKind::Context.prefix(),
                    content,
                    kind: LineKind::Context,
                    hunk_index,
                });
            }
            Event::Change {
                hunk_index,
                removed,
                added,
            } => {
                for line in removed {
                    out.push(DiffLineEntry {
                        old_num: Some(line.num),
                        new_num: None,
                        prefix: LineKind::Removed.prefix(),
                        content: line.content,
                        kind: LineKind::Removed,
                        hunk_index,
                    });
                }
                for line in added {
                    out.push(DiffLineEntry {
                        old_num: None,
                        new_num: Some(line.num),
                        prefix: LineKind::Added.prefix(),
                        content: line.content,
                        kind: LineKind::Added,
                        hunk_index,
                    });
                }
            }
        }
    }
    out
}

/// Build the split (two-column) layout.
///
/// Columns advance row for row: an unpaired line faces an `Empty` cell.
pub fn build_split<W: WordDiff + ?Sized>(
    hunks: &[Hunk],
    old_tokens: Tokens<'_>,
    new_tokens: Tokens<'_>,
    word_diff: &W,
) -> SplitLines {
    let mut out = SplitLines::default();
    for event in Walker::new(old_tokens, new_tokens, word_diff).walk(hunks) {
        match event {
            Event::Context {
                hunk_index,
                old_num,
                new_num,
                old,
                new,
            } => {
                out.left.push(SplitLineEntry {
                    content: old,
                    kind: SplitKind::Context,
                    num: Some(old_num),
                    hunk_index,
                });
                out.right.push(SplitLineEntry {
                    content: new,
                    kind: SplitKind::Context,
                    num: Some(new_num),
                    hunk_index,
                });
            }
            Event::Change {
                hunk_index,
                removed,
                added,
            } => {
                let rows = removed.len().max(added.len());
                let mut removed = removed.into_iter();
                let mut added = added.into_iter();
                for _ in 0..rows {
                    out.left.push(match removed.next() {
                        Some(line) => SplitLineEntry {
                            content: line.content,
                            kind: SplitKind::Removed,
                            num: Some(line.num),
                            hunk_index,
                        },
                        None => SplitLineEntry::empty(hunk_index),
                    });
                    out.right.push(match added.next() {
                        Some(line) => SplitLineEntry {
                            content: line.content,
                            kind: SplitKind::Added,
                            num: Some(line.num),
                            hunk_index,
                        },
                        None => SplitLineEntry::empty(hunk_index),
                    });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SimilarWordDiff;
    use crate::fuse::{fragments_text, Highlight};
    use crate::token::{Token, TokenLine, TokenStyle};

    fn hunk(old_start: usize, new_start: usize, lines: &[&str]) -> Hunk {
        let mut h = Hunk::new(old_start, new_start);
        for line in lines {
            let (kind, text) = LineKind::split(line);
            h.push_line(kind, text);
        }
        h
    }

    fn unified(hunks: &[Hunk]) -> Vec<DiffLineEntry> {
        build_unified(hunks, Tokens::Plain, Tokens::Plain, &SimilarWordDiff)
    }

    fn is_word_highlighted(entry: &[Fragment]) -> bool {
        entry.iter().any(|f| f.highlight.is_some())
    }

    /// One single-token line per entry, styled by its position in the stream
    fn numbered_stream(lines: &[&str]) -> Vec<TokenLine> {
        lines
            .iter()
            .enumerate()
            .map(|(i, text)| vec![Token::new(*text, TokenStyle::fg(i as u8, 0, 0))])
            .collect()
    }

    #[test]
    fn test_context_line_numbers() {
        let hunks = vec![hunk(3, 5, &[" a", " b"])];
        let lines = unified(&hunks);
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].old_num, lines[0].new_num), (Some(3), Some(5)));
        assert_eq!((lines[1].old_num, lines[1].new_num), (Some(4), Some(6)));
        assert_eq!(lines[1].prefix, ' ');
        assert_eq!(fragments_text(&lines[1].content), "b");
    }

    #[test]
    fn test_three_removed_one_added() {
        let hunks = vec![hunk(
            1,
            1,
            &["-let a = 1;", "-let b = 2;", "-let c = 3;", "+let a = 10;"],
        )];
        let lines = unified(&hunks);
        let kinds: Vec<_> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Removed,
                LineKind::Removed,
                LineKind::Removed,
                LineKind::Added
            ]
        );

        let paired_removed = lines
            .iter()
            .filter(|l| l.kind == LineKind::Removed && is_word_highlighted(&l.content))
            .count();
        assert_eq!(paired_removed, 1, "only the first removed line is paired");
        assert!(is_word_highlighted(&lines[0].content));
        assert!(!is_word_highlighted(&lines[1].content));
        assert!(!is_word_highlighted(&lines[2].content));
        assert!(is_word_highlighted(&lines[3].content));

        assert_eq!(lines[0].old_num, Some(1));
        assert_eq!(lines[2].old_num, Some(3));
        assert_eq!(lines[3].new_num, Some(1));
        assert_eq!(lines[3].old_num, None);
    }

    #[test]
    fn test_paired_word_highlight_markers() {
        let hunks = vec![hunk(1, 1, &["-const foo = 4", "+const bar = 4"])];
        let lines = unified(&hunks);
        let removed: Vec<_> = lines[0]
            .content
            .iter()
            .filter(|f| f.highlight == Some(Highlight::Removed))
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(removed, vec!["foo"]);
        let added: Vec<_> = lines[1]
            .content
            .iter()
            .filter(|f| f.highlight == Some(Highlight::Added))
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(added, vec!["bar"]);
        assert_eq!(fragments_text(&lines[0].content), "const foo = 4");
        assert_eq!(fragments_text(&lines[1].content), "const bar = 4");
    }

    #[test]
    fn test_pure_addition_and_deletion() {
        let hunks = vec![hunk(1, 1, &[" a", "+b", "+c", " d", "-e"])];
        let lines = unified(&hunks);
        assert_eq!(lines.len(), 5);
        assert_eq!((lines[1].old_num, lines[1].new_num), (None, Some(2)));
        assert_eq!((lines[2].old_num, lines[2].new_num), (None, Some(3)));
        assert_eq!((lines[3].old_num, lines[3].new_num), (Some(2), Some(4)));
        assert_eq!((lines[4].old_num, lines[4].new_num), (Some(3), None));
        assert!(lines.iter().all(|l| !is_word_highlighted(&l.content)));
    }

    #[test]
    fn test_added_run_then_removed_run_is_not_paired() {
        let hunks = vec![hunk(1, 1, &["+new", "-old"])];
        let lines = unified(&hunks);
        assert_eq!(lines[0].kind, LineKind::Added);
        assert_eq!(lines[1].kind, LineKind::Removed);
        assert!(lines.iter().all(|l| !is_word_highlighted(&l.content)));
    }

    #[test]
    fn test_malformed_line_is_context() {
        let hunks = vec![hunk(1, 1, &["-x"])];
        let mut hunks = hunks;
        hunks[0].lines.push("no prefix".to_string());
        let lines = unified(&hunks);
        assert_eq!(lines[1].kind, LineKind::Context);
        assert_eq!(fragments_text(&lines[1].content), "no prefix");
        assert_eq!(lines[1].old_num, Some(2));
        assert_eq!(lines[1].new_num, Some(1));
    }

    #[test]
    fn test_split_rows_align() {
        let hunks = vec![hunk(
            1,
            1,
            &[" ctx", "-r1", "-r2", "-r3", "+a1", " tail", "+only"],
        )];
        let split = build_split(&hunks, Tokens::Plain, Tokens::Plain, &SimilarWordDiff);
        assert_eq!(split.left.len(), split.right.len());

        let left: Vec<_> = split.left.iter().map(|e| e.kind).collect();
        let right: Vec<_> = split.right.iter().map(|e| e.kind).collect();
        assert_eq!(
            left,
            vec![
                SplitKind::Context,
                SplitKind::Removed,
                SplitKind::Removed,
                SplitKind::Removed,
                SplitKind::Context,
                SplitKind::Empty,
            ]
        );
        assert_eq!(
            right,
            vec![
                SplitKind::Context,
                SplitKind::Added,
                SplitKind::Empty,
                SplitKind::Empty,
                SplitKind::Context,
                SplitKind::Added,
            ]
        );
        assert_eq!(split.left[4].num, Some(5));
        assert_eq!(split.right[4].num, Some(3));
        assert_eq!(split.right[5].num, Some(4));
        assert_eq!(split.left[5].num, None);

        let rows = split.into_rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1].hunk_index(), 0);
    }

    #[test]
    fn test_token_cursors_span_hunks() {
        let hunks = vec![
            hunk(1, 1, &[" a", "-b", "+B"]),
            hunk(10, 10, &[" c", "-d", "+D", "+E"]),
        ];
        // Old side: a b c d ; new side: a B c D E
        let old_stream = numbered_stream(&["a", "b", "c", "d"]);
        let new_stream = numbered_stream(&["a", "B", "c", "D", "E"]);
        let lines = build_unified(
            &hunks,
            Tokens::Styled(&old_stream),
            Tokens::Styled(&new_stream),
            &SimilarWordDiff,
        );

        let style_of = |idx: usize| lines[idx].content[0].style.and_then(|s| s.foreground);
        // "d" is the 4th old-side line, "E" the 5th new-side line
        let d = lines.iter().position(|l| fragments_text(&l.content) == "d").unwrap();
        let e = lines.iter().position(|l| fragments_text(&l.content) == "E").unwrap();
        assert_eq!(style_of(d).map(|c| c.0), Some(3));
        assert_eq!(style_of(e).map(|c| c.0), Some(4));
        assert_eq!(lines[e].hunk_index, 1);
    }

    #[test]
    fn test_short_token_stream_degrades_to_plain() {
        let hunks = vec![hunk(1, 1, &[" a", " b"])];
        let new_stream = numbered_stream(&["a"]);
        let lines = build_unified(
            &hunks,
            Tokens::Plain,
            Tokens::Styled(&new_stream),
            &SimilarWordDiff,
        );
        assert!(lines[0].content[0].style.is_some());
        assert!(lines[1].content[0].style.is_none());
        assert_eq!(fragments_text(&lines[1].content), "b");
    }

    #[test]
    fn test_unified_context_falls_back_to_old_tokens() {
        let hunks = vec![hunk(1, 1, &[" a"])];
        let old_stream = numbered_stream(&["a"]);
        let lines = build_unified(
            &hunks,
            Tokens::Styled(&old_stream),
            Tokens::Plain,
            &SimilarWordDiff,
        );
        assert!(lines[0].content[0].style.is_some());
    }
}
