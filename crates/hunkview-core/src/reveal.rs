//! Incremental reveal of hidden gaps
//!
//! Every gap has two counters growing from opposite ends: `top` counts lines
//! shown from the start of the gap (right after the preceding hunk), `bottom`
//! counts lines shown from its end (right before the following hunk). The
//! hidden middle shrinks until nothing is left and the separator disappears.

use crate::gap::{GapKey, GapMap};
use crate::token::{CodeRun, Highlighter, JobStamp, TokenBatch, TokenJob, TokenLine, TokenTarget};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Lines revealed by one edge expansion
pub const EXPAND_STEP: usize = 10;

/// Reveal counters of one gap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapReveal {
    pub top: usize,
    pub bottom: usize,
}

/// How a gap separator offers to reveal more
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapAffordance {
    /// Few enough lines left for a single full reveal
    ExpandAll { hidden: usize },
    /// Grow from either edge, with a hidden-line count
    Edges { hidden: usize },
}

impl GapAffordance {
    pub fn hidden(&self) -> usize {
        match *self {
            GapAffordance::ExpandAll { hidden } | GapAffordance::Edges { hidden } => hidden,
        }
    }
}

/// A reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapAction {
    /// Grow from the start of the gap
    Top,
    /// Grow from the end of the gap
    Bottom,
    All,
}

impl GapReveal {
    pub fn hidden(&self, total: usize) -> usize {
        total.saturating_sub(self.top + self.bottom)
    }

    /// Indices shown from the start of the gap
    pub fn top_range(&self, total: usize) -> Range<usize> {
        0..self.top.min(total)
    }

    /// Indices shown from the end of the gap
    pub fn bottom_range(&self, total: usize) -> Range<usize> {
        let top = self.top.min(total);
        total.saturating_sub(self.bottom).max(top)..total
    }

    pub fn revealed_indices(&self, total: usize) -> impl Iterator<Item = usize> {
        self.top_range(total).chain(self.bottom_range(total))
    }

    /// Reveal up to `step` more lines from the start; returns the newly shown
    /// indices
    pub fn expand_top(&mut self, total: usize, step: usize) -> Range<usize> {
        let n = step.min(self.hidden(total));
        let from = self.top;
        self.top += n;
        from..from + n
    }

    /// Reveal up to `step` more lines from the end; returns the newly shown
    /// indices
    pub fn expand_bottom(&mut self, total: usize, step: usize) -> Range<usize> {
        let n = step.min(self.hidden(total));
        let to = total - self.bottom;
        self.bottom += n;
        to - n..to
    }

    /// Reveal everything at once; returns the previously hidden middle
    pub fn expand_all(&mut self, total: usize) -> Range<usize> {
        if self.hidden(total) == 0 {
            return 0..0;
        }
        let newly = self.top..total - self.bottom;
        self.top = total;
        self.bottom = 0;
        newly
    }

    pub fn apply(&mut self, action: GapAction, total: usize, step: usize) -> Range<usize> {
        match action {
            GapAction::Top => self.expand_top(total, step),
            GapAction::Bottom => self.expand_bottom(total, step),
            GapAction::All => self.expand_all(total),
        }
    }

    /// Separator to draw, or `None` once the gap is fully revealed
    pub fn affordance(&self, total: usize, step: usize) -> Option<GapAffordance> {
        match self.hidden(total) {
            0 => None,
            hidden if hidden <= step => Some(GapAffordance::ExpandAll { hidden }),
            hidden => Some(GapAffordance::Edges { hidden }),
        }
    }
}

/// Result of a reveal that changed something
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapChange {
    pub key: GapKey,
    pub reveal: GapReveal,
    /// Newly shown gap line indices
    pub revealed: Range<usize>,
}

/// Per-gap state: reveal counters and the tokens of revealed lines
#[derive(Debug, Clone, Default)]
pub struct GapExpansion {
    pub reveal: GapReveal,
    pub tokens: BTreeMap<usize, TokenLine>,
    /// Lines whose job was committed, whether or not tokens came back
    attempted: BTreeSet<usize>,
    /// Lines of the job dispatched last and not yet committed
    in_flight: BTreeSet<usize>,
    generation: u64,
}

impl GapExpansion {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the reveal state and token cache of every gap in one diff
#[derive(Debug, Clone)]
pub struct GapExpansionController {
    gaps: GapMap,
    entries: FxHashMap<GapKey, GapExpansion>,
    step: usize,
    epoch: u64,
    file_path: Option<String>,
}

impl Default for GapExpansionController {
    fn default() -> Self {
        Self::new(GapMap::default())
    }
}

impl GapExpansionController {
    pub fn new(gaps: GapMap) -> Self {
        Self {
            gaps,
            entries: FxHashMap::default(),
            step: EXPAND_STEP,
            epoch: 0,
            file_path: None,
        }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    /// Replace the gaps and forget every reveal and cached token.
    ///
    /// Jobs dispatched before the reset are rejected on commit.
    pub(crate) fn reset(&mut self, gaps: GapMap, epoch: u64, file_path: Option<String>) {
        self.gaps = gaps;
        self.entries.clear();
        self.epoch = epoch;
        self.file_path = file_path;
    }

    pub fn gaps(&self) -> &GapMap {
        &self.gaps
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn expansion(&self, key: GapKey) -> Option<&GapExpansion> {
        self.entries.get(&key)
    }

    pub fn reveal(&self, key: GapKey) -> GapReveal {
        self.entries.get(&key).map(|e| e.reveal).unwrap_or_default()
    }

    pub fn hidden(&self, key: GapKey) -> usize {
        self.gaps
            .get(key)
            .map_or(0, |gap| self.reveal(key).hidden(gap.len()))
    }

    pub fn affordance(&self, key: GapKey) -> Option<GapAffordance> {
        let gap = self.gaps.get(key)?;
        self.reveal(key).affordance(gap.len(), self.step)
    }

    /// Update the counters of `key`.
    ///
    /// `None` for an unknown gap or when nothing is left to reveal.
    pub fn apply(&mut self, key: GapKey, action: GapAction) -> Option<GapChange> {
        let total = self.gaps.get(key)?.len();
        let entry = self.entries.entry(key).or_default();
        let revealed = entry.reveal.apply(action, total, self.step);
        if revealed.is_empty() {
            return None;
        }
        Some(GapChange {
            key,
            reveal: entry.reveal,
            revealed,
        })
    }

    /// Reveal lines and ask for tokens of the newly shown ones.
    ///
    /// Lines of a superseded job (dispatched before this reveal and not yet
    /// committed) are asked for again, since that job will be rejected. Lines
    /// whose tokenization already finished are never asked for twice, even
    /// when the tokenizer had nothing for them.
    pub fn expand(
        &mut self,
        key: GapKey,
        action: GapAction,
        highlighter: Option<&Highlighter>,
    ) -> Option<TokenJob> {
        let change = self.apply(key, action)?;
        log::trace!("gap {key:?} revealed {:?}", change.revealed);
        let highlighter = highlighter?;
        let gap = self.gaps.get(key)?;
        let entry = self.entries.get_mut(&key)?;
        entry.generation += 1;

        let superseded = std::mem::take(&mut entry.in_flight);
        let missing: Vec<usize> = change
            .revealed
            .chain(superseded)
            .filter(|i| !entry.tokens.contains_key(i) && !entry.attempted.contains(i))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let runs = contiguous_runs(&missing)
            .into_iter()
            .map(|range| CodeRun::from_lines(range.start, &gap.lines[range]))
            .collect::<Vec<_>>();
        if runs.is_empty() {
            return None;
        }

        let stamp = JobStamp {
            epoch: self.epoch,
            generation: entry.generation,
            file_path: self.file_path.clone(),
        };
        let (hits, job) = highlighter.dispatch(stamp, TokenTarget::Gap(key), runs);
        merge_lines(&mut entry.tokens, hits, gap.len());
        if job.is_some() {
            entry.in_flight = missing
                .into_iter()
                .filter(|i| !entry.tokens.contains_key(i))
                .collect();
        }
        job
    }

    /// Merge a finished gap job into its gap's cache.
    ///
    /// Returns `false` when the batch is stale: another reveal happened, the
    /// diff changed, or the batch belongs to another file.
    pub fn commit(&mut self, batch: TokenBatch) -> bool {
        let TokenTarget::Gap(key) = batch.target else {
            return false;
        };
        if batch.stamp.epoch != self.epoch || batch.stamp.file_path != self.file_path {
            log::debug!("discarding gap tokens for {key:?} from an older diff");
            return false;
        }
        let (Some(gap), Some(entry)) = (self.gaps.get(key), self.entries.get_mut(&key)) else {
            return false;
        };
        if entry.generation != batch.stamp.generation {
            log::debug!(
                "discarding stale gap tokens for {key:?} (generation {} != {})",
                batch.stamp.generation,
                entry.generation
            );
            return false;
        }
        let finished = std::mem::take(&mut entry.in_flight);
        entry.attempted.extend(finished);
        merge_lines(&mut entry.tokens, batch.results, gap.len());
        true
    }
}

fn merge_lines(
    cache: &mut BTreeMap<usize, TokenLine>,
    results: Vec<(usize, Vec<TokenLine>)>,
    limit: usize,
) {
    for (start, lines) in results {
        for (offset, line) in lines.into_iter().enumerate() {
            let index = start + offset;
            if index >= limit {
                break;
            }
            cache.insert(index, line);
        }
    }
}

/// Group sorted indices into contiguous ranges
fn contiguous_runs(indices: &[usize]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for &i in indices {
        match runs.last_mut() {
            Some(run) if run.end == i => run.end += 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}
