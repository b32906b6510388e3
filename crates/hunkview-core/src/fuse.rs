//! Fusing word-diff segments with syntax tokens
//!
//! A changed line is described twice: once by the word diff (which parts
//! changed) and once by the highlighter (which parts are keywords, strings,
//! ...). Neither set of boundaries may be lost, so the fused output cuts at
//! the union of both. Concatenating the fragments of one side always gives
//! back that side's line byte for byte.

use crate::diff::DiffChunk;
use crate::token::{Token, TokenStyle};
use serde::Serialize;

/// Which version of the file a line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Old,
    New,
}

impl Side {
    /// Word-diff filter: the old side keeps everything not added, the new
    /// side everything not removed
    pub fn keeps(self, chunk: &DiffChunk) -> bool {
        match self {
            Side::Old => !chunk.added,
            Side::New => !chunk.removed,
        }
    }

    /// Marker carried by changed segments on this side
    pub fn marker(self) -> Highlight {
        match self {
            Side::Old => Highlight::Removed,
            Side::New => Highlight::Added,
        }
    }
}

/// Word-level change marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Removed,
    Added,
}

/// A renderable piece of a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<TokenStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

impl Fragment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
            highlight: None,
        }
    }
}

/// Concatenated text of a fragment list
pub fn fragments_text(fragments: &[Fragment]) -> String {
    fragments.iter().map(|f| f.text.as_str()).collect()
}

struct TokenCursor<'a> {
    tokens: std::slice::Iter<'a, Token>,
    current: Option<&'a Token>,
    offset: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let mut cursor = Self {
            tokens: tokens.iter(),
            current: None,
            offset: 0,
        };
        cursor.advance();
        cursor
    }

    fn advance(&mut self) {
        self.offset = 0;
        self.current = self.tokens.by_ref().find(|t| !t.content.is_empty());
    }

    /// Bytes left in the current token and its style
    fn remaining(&self) -> Option<(usize, TokenStyle)> {
        self.current
            .map(|token| (token.content.len() - self.offset, token.style))
    }

    /// Move past `len` bytes; a cut that ran over the current token eats
    /// into the following ones
    fn consume(&mut self, len: usize) {
        self.offset += len;
        while let Some(token) = self.current {
            let size = token.content.len();
            if self.offset < size {
                break;
            }
            let overshoot = self.offset - size;
            self.advance();
            self.offset = overshoot;
        }
    }
}

/// Length of the next cut: at most `want` bytes, moved forward to a char
/// boundary when the token and segment texts disagree mid code point
fn cut_len(rest: &str, want: usize) -> usize {
    let mut len = want.clamp(1, rest.len());
    while !rest.is_char_boundary(len) {
        len += 1;
    }
    len
}

/// Fuse word-diff segments with one side's tokens for the same line.
///
/// Segments are filtered for `side` first. Without tokens every kept segment
/// becomes one unstyled fragment. With tokens, each fragment ends at the
/// nearer of the next segment boundary and the next token boundary; text past
/// the last token is emitted unstyled.
pub fn fuse_segments(
    segments: &[DiffChunk],
    tokens: Option<&[Token]>,
    side: Side,
) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut cursor = tokens.map(TokenCursor::new);

    for segment in segments.iter().filter(|s| side.keeps(s)) {
        if segment.value.is_empty() {
            continue;
        }
        let highlight = segment.is_change().then_some(side.marker());

        let Some(tc) = cursor.as_mut() else {
            fragments.push(Fragment {
                text: segment.value.clone(),
                style: None,
                highlight,
            });
            continue;
        };

        let mut rest = segment.value.as_str();
        while !rest.is_empty() {
            let Some((available, style)) = tc.remaining() else {
                fragments.push(Fragment {
                    text: rest.to_string(),
                    style: None,
                    highlight,
                });
                break;
            };
            let len = cut_len(rest, available);
            fragments.push(Fragment {
                text: rest[..len].to_string(),
                style: Some(style),
                highlight,
            });
            tc.consume(len);
            rest = &rest[len..];
        }
    }

    fragments
}

/// Render a whole line with no word diff, split only at token boundaries
pub fn fuse_line(text: &str, tokens: Option<&[Token]>) -> Vec<Fragment> {
    let whole = [DiffChunk::equal(text)];
    fuse_segments(&whole, tokens, Side::New)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{SimilarWordDiff, WordDiff};

    fn style(n: u8) -> TokenStyle {
        TokenStyle::fg(n, n, n)
    }

    fn tok(text: &str, n: u8) -> Token {
        Token::new(text, style(n))
    }

    #[test]
    fn test_plain_fragments_follow_segments() {
        let segments = vec![
            DiffChunk::equal("let "),
            DiffChunk::removed("a"),
            DiffChunk::added("b"),
            DiffChunk::equal(" = 1;"),
        ];
        let old = fuse_segments(&segments, None, Side::Old);
        assert_eq!(
            old,
            vec![
                Fragment::plain("let "),
                Fragment {
                    text: "a".into(),
                    style: None,
                    highlight: Some(Highlight::Removed)
                },
                Fragment::plain(" = 1;"),
            ]
        );

        let new = fuse_segments(&segments, None, Side::New);
        assert_eq!(fragments_text(&new), "let b = 1;");
        assert_eq!(new[1].highlight, Some(Highlight::Added));
    }

    #[test]
    fn test_segment_boundary_splits_token() {
        let segments = vec![
            DiffChunk::equal("const "),
            DiffChunk::removed("foo"),
            DiffChunk::equal(" = 4"),
        ];
        let tokens = vec![tok("const foo", 1), tok(" = 4", 2)];
        let frags = fuse_segments(&segments, Some(&tokens), Side::Old);

        let shape: Vec<_> = frags
            .iter()
            .map(|f| (f.text.as_str(), f.style, f.highlight))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("const ", Some(style(1)), None),
                ("foo", Some(style(1)), Some(Highlight::Removed)),
                (" = 4", Some(style(2)), None),
            ]
        );
    }

    #[test]
    fn test_segment_spans_multiple_tokens() {
        let segments = vec![DiffChunk::added("fn main()")];
        let tokens = vec![tok("fn", 1), tok(" ", 2), tok("main", 3), tok("()", 4)];
        let frags = fuse_segments(&segments, Some(&tokens), Side::New);
        assert_eq!(frags.len(), 4);
        assert!(frags
            .iter()
            .all(|f| f.highlight == Some(Highlight::Added)));
        assert_eq!(frags[2].style, Some(style(3)));
    }

    #[test]
    fn test_cut_past_char_boundary_keeps_later_tokens_aligned() {
        // token texts disagree with the line inside the two-byte "é"
        let tokens = vec![tok("x", 1), tok("y", 2), tok("ab", 3), tok("c", 4)];
        let frags = fuse_line("éabc", Some(&tokens));

        let shape: Vec<_> = frags.iter().map(|f| (f.text.as_str(), f.style)).collect();
        assert_eq!(
            shape,
            vec![
                ("é", Some(style(1))),
                ("ab", Some(style(3))),
                ("c", Some(style(4))),
            ]
        );
    }

    #[test]
    fn test_tokens_exhausted_leaves_remainder_unstyled() {
        let segments = vec![DiffChunk::equal("abcdef")];
        let tokens = vec![tok("abc", 1)];
        let frags = fuse_segments(&segments, Some(&tokens), Side::Old);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].text, "abc");
        assert_eq!(frags[1], Fragment::plain("def"));
    }

    #[test]
    fn test_empty_tokens_are_skipped() {
        let segments = vec![DiffChunk::equal("ab")];
        let tokens = vec![tok("", 9), tok("a", 1), tok("", 9), tok("b", 2)];
        let frags = fuse_segments(&segments, Some(&tokens), Side::Old);
        let styles: Vec<_> = frags.iter().map(|f| f.style).collect();
        assert_eq!(styles, vec![Some(style(1)), Some(style(2))]);
    }

    #[test]
    fn test_misaligned_multibyte_tokens_do_not_split_chars() {
        let segments = vec![DiffChunk::equal("héllo")];
        // Token boundary claims one byte, landing inside 'é'
        let tokens = vec![tok("h", 1), tok("x", 2), tok("llo!", 3)];
        let frags = fuse_segments(&segments, Some(&tokens), Side::Old);
        assert_eq!(fragments_text(&frags), "héllo");
    }

    #[test]
    fn test_reconstruction_with_word_diff_and_tokens() {
        let old = "        return value;";
        let new = "    return newValue;";
        let segments = SimilarWordDiff.diff_words(old, new);

        let old_tokens = vec![
            tok("        ", 1),
            tok("return", 2),
            tok(" ", 1),
            tok("value", 3),
            tok(";", 4),
        ];
        let new_tokens = vec![
            tok("    ", 1),
            tok("return", 2),
            tok(" ", 1),
            tok("newValue", 3),
            tok(";", 4),
        ];

        for tokens in [None, Some(old_tokens.as_slice())] {
            let frags = fuse_segments(&segments, tokens, Side::Old);
            assert_eq!(fragments_text(&frags), old);
        }
        for tokens in [None, Some(new_tokens.as_slice())] {
            let frags = fuse_segments(&segments, tokens, Side::New);
            assert_eq!(fragments_text(&frags), new);
        }
    }

    #[test]
    fn test_reconstruction_whitespace_only_lines() {
        for (old, new) in [("\t\t", "    "), ("  \t ", " \t  "), ("", "\t")] {
            let segments = SimilarWordDiff.diff_words(old, new);
            assert_eq!(fragments_text(&fuse_segments(&segments, None, Side::Old)), old);
            assert_eq!(fragments_text(&fuse_segments(&segments, None, Side::New)), new);
        }
    }

    #[test]
    fn test_fuse_line() {
        assert_eq!(fuse_line("x = 1", None), vec![Fragment::plain("x = 1")]);
        assert!(fuse_line("", None).is_empty());

        let tokens = vec![tok("x", 1), tok(" = ", 2), tok("1", 3)];
        let frags = fuse_line("x = 1", Some(&tokens));
        assert_eq!(frags.len(), 3);
        assert!(frags.iter().all(|f| f.highlight.is_none()));
    }
}
