//! Hidden context between hunks
//!
//! A gap is a run of unchanged original-file lines that the patch does not
//! show. Gaps are keyed by the hunk they precede; a file can also end with a
//! trailing gap after the last hunk. Together with the hunks' old-line ranges
//! the gaps cover every line of the original file exactly once.

use crate::hunk::Hunk;
use serde::Serialize;
use std::collections::BTreeMap;

/// Identifies a gap within one diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapKey {
    /// Lines before hunk `n` (`Before(0)` is the top of the file)
    Before(usize),
    /// Lines after the last hunk
    Trailing,
}

/// A run of original-file lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub lines: Vec<String>,
    /// 1-based line number of `lines[0]`
    pub start_line_number: usize,
}

impl Gap {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Old-file line number of the line at `index` within the gap
    pub fn line_number(&self, index: usize) -> usize {
        self.start_line_number + index
    }
}

/// All gaps of one diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapMap {
    pub gaps: BTreeMap<usize, Gap>,
    pub trailing: Option<Gap>,
}

impl GapMap {
    pub fn get(&self, key: GapKey) -> Option<&Gap> {
        match key {
            GapKey::Before(idx) => self.gaps.get(&idx),
            GapKey::Trailing => self.trailing.as_ref(),
        }
    }

    /// Gaps in document order
    pub fn iter(&self) -> impl Iterator<Item = (GapKey, &Gap)> {
        self.gaps
            .iter()
            .map(|(idx, gap)| (GapKey::Before(*idx), gap))
            .chain(self.trailing.iter().map(|gap| (GapKey::Trailing, gap)))
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty() && self.trailing.is_none()
    }

    pub fn len(&self) -> usize {
        self.gaps.len() + usize::from(self.trailing.is_some())
    }

    /// Total number of hidden lines across all gaps
    pub fn total_lines(&self) -> usize {
        self.iter().map(|(_, gap)| gap.len()).sum()
    }
}

/// Compute the gaps hidden before, between and after `hunks`.
///
/// `original_lines` is the full old file, 0-based. Hunks must be ordered by
/// `old_start`. Coordinates past the end of the file clamp to nothing.
pub fn compute_gap_map<S: AsRef<str>>(hunks: &[Hunk], original_lines: &[S]) -> GapMap {
    let mut map = GapMap::default();
    let (Some(first), Some(last)) = (hunks.first(), hunks.last()) else {
        return map;
    };
    let file_len = original_lines.len();

    if first.old_start > 1 {
        if let Some(gap) = slice_gap(original_lines, 1, first.old_start - 1) {
            map.gaps.insert(0, gap);
        }
    }

    for (i, pair) in hunks.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);
        let gap_start = prev.old_end();
        let gap_end = curr.old_start.saturating_sub(1);
        if gap_end >= gap_start {
            if let Some(gap) = slice_gap(original_lines, gap_start, gap_end) {
                map.gaps.insert(i + 1, gap);
            }
        }
    }

    let trailing_start = last.old_end();
    if trailing_start <= file_len {
        map.trailing = slice_gap(original_lines, trailing_start, file_len);
    }

    map
}

/// Lines `[start, end]` (1-based, inclusive), clamped to the file
fn slice_gap<S: AsRef<str>>(lines: &[S], start: usize, end: usize) -> Option<Gap> {
    let start = start.max(1);
    let from = (start - 1).min(lines.len());
    let to = end.min(lines.len());
    if from >= to {
        return None;
    }
    Some(Gap {
        lines: lines[from..to]
            .iter()
            .map(|line| line.as_ref().to_string())
            .collect(),
        start_line_number: start,
    })
}
