//! The renderable line model and the stateful renderer behind it
//!
//! [`DiffRenderer`] owns everything that changes while a diff is on screen:
//! whole-diff token streams for both sides, reveal state of every gap and
//! the epoch that invalidates in-flight tokenization when the hunks change.
//! [`render`] is the stateless entry point for callers that only want one
//! plain snapshot.

use crate::diff::{SimilarWordDiff, WordDiff};
use crate::fuse::{fuse_line, Fragment, Side};
use crate::gap::{compute_gap_map, GapKey};
use crate::group::{group_by_hunk, HunkTagged};
use crate::hunk::{Hunk, LineKind};
use crate::line::{build_split, build_unified, DiffLineEntry, SplitKind, SplitLineEntry, SplitRow};
use crate::reveal::{GapAction, GapAffordance, GapExpansionController, EXPAND_STEP};
use crate::token::{
    CodeRun, Highlighter, JobStamp, Token, TokenBatch, TokenJob, TokenLine, TokenTarget, Tokens,
};
use serde::{Deserialize, Serialize};

/// Whole-diff highlighting is skipped above this many hunk lines
pub const HIGHLIGHT_LINE_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Unified,
    Split,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Unified => ViewMode::Split,
            ViewMode::Split => ViewMode::Unified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Lines revealed per edge expansion
    pub expand_step: usize,
    /// Ceiling on total hunk lines for whole-diff highlighting
    pub highlight_line_limit: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            expand_step: EXPAND_STEP,
            highlight_line_limit: HIGHLIGHT_LINE_LIMIT,
        }
    }
}

/// Separator standing in for the hidden middle of a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GapMarker {
    pub key: GapKey,
    pub hidden: usize,
    pub affordance: GapAffordance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum Row<L> {
    /// A line of a hunk
    Line(L),
    /// A revealed line of gap `key`
    Revealed { key: GapKey, line: L },
    Gap(GapMarker),
}

impl<L> Row<L> {
    /// The gap a row belongs to, if any
    pub fn gap_key(&self) -> Option<GapKey> {
        match self {
            Row::Line(_) => None,
            Row::Revealed { key, .. } => Some(*key),
            Row::Gap(marker) => Some(marker.key),
        }
    }

    pub fn line(&self) -> Option<&L> {
        match self {
            Row::Line(line) | Row::Revealed { line, .. } => Some(line),
            Row::Gap(_) => None,
        }
    }
}

/// Everything a list UI needs to draw one diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "rows", rename_all = "lowercase")]
pub enum RenderModel {
    Unified(Vec<Row<DiffLineEntry>>),
    Split(Vec<Row<SplitRow>>),
}

impl RenderModel {
    pub fn view_mode(&self) -> ViewMode {
        match self {
            RenderModel::Unified(_) => ViewMode::Unified,
            RenderModel::Split(_) => ViewMode::Split,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RenderModel::Unified(rows) => rows.len(),
            RenderModel::Split(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn gap_key(&self, index: usize) -> Option<GapKey> {
        match self {
            RenderModel::Unified(rows) => rows.get(index)?.gap_key(),
            RenderModel::Split(rows) => rows.get(index)?.gap_key(),
        }
    }

    /// Index of the first separator row
    pub fn first_gap(&self) -> Option<usize> {
        match self {
            RenderModel::Unified(rows) => rows.iter().position(|r| matches!(r, Row::Gap(_))),
            RenderModel::Split(rows) => rows.iter().position(|r| matches!(r, Row::Gap(_))),
        }
    }
}

/// A revealed gap line, before it is shaped for a layout
struct GapLine<'a> {
    text: &'a str,
    old_num: usize,
    new_num: usize,
    tokens: Option<&'a [Token]>,
    hunk_index: usize,
}

#[derive(Debug, Default)]
struct SideTokens {
    lines: Option<Vec<TokenLine>>,
    generation: u64,
}

/// Stateful renderer for one file's diff
pub struct DiffRenderer {
    hunks: Vec<Hunk>,
    file_path: Option<String>,
    original: Option<Vec<String>>,
    options: RenderOptions,
    word_diff: Box<dyn WordDiff + Send + Sync>,
    highlighter: Option<Highlighter>,
    sides: [SideTokens; 2],
    gaps: GapExpansionController,
    /// Bumped when the hunks change; stamps whole-diff jobs
    epoch: u64,
    /// Bumped when the hunks or the original change; stamps gap jobs
    gap_epoch: u64,
}

impl std::fmt::Debug for DiffRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffRenderer")
            .field("hunks", &self.hunks.len())
            .field("file_path", &self.file_path)
            .field("epoch", &self.epoch)
            .field("highlighter", &self.highlighter)
            .finish_non_exhaustive()
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Old => 0,
        Side::New => 1,
    }
}

/// The lines of one side across all hunks, in document order
fn side_lines(hunks: &[Hunk], side: Side) -> Vec<&str> {
    hunks
        .iter()
        .flat_map(Hunk::iter_lines)
        .filter(|(kind, _)| match side {
            Side::Old => *kind != LineKind::Added,
            Side::New => *kind != LineKind::Removed,
        })
        .map(|(_, text)| text)
        .collect()
}

/// Lines of a full file, split the way the hunk normalizer splits them
fn file_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.strip_suffix('\n')
        .unwrap_or(text)
        .split('\n')
        .map(str::to_string)
        .collect()
}

fn shift(line: usize, delta: isize) -> usize {
    line.checked_add_signed(delta).unwrap_or(line)
}

impl DiffRenderer {
    pub fn new(hunks: Vec<Hunk>) -> Self {
        Self {
            hunks,
            file_path: None,
            original: None,
            options: RenderOptions::default(),
            word_diff: Box::new(SimilarWordDiff),
            highlighter: None,
            sides: Default::default(),
            gaps: GapExpansionController::default(),
            epoch: 0,
            gap_epoch: 0,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self.rebuild_gaps();
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self.rebuild_gaps();
        self
    }

    /// Supply the full old file; without it there are no gaps
    pub fn with_original(mut self, text: &str) -> Self {
        self.original = Some(file_lines(text));
        self.rebuild_gaps();
        self
    }

    pub fn with_word_diff<W>(mut self, word_diff: W) -> Self
    where
        W: WordDiff + Send + Sync + 'static,
    {
        self.word_diff = Box::new(word_diff);
        self
    }

    pub fn with_highlighter(mut self, highlighter: Option<Highlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn gaps(&self) -> &GapExpansionController {
        &self.gaps
    }

    pub fn language(&self) -> Option<&str> {
        self.highlighter.as_ref().map(Highlighter::language)
    }

    /// Whether whole-diff tokens have arrived for `side`
    pub fn has_tokens(&self, side: Side) -> bool {
        self.sides[side_index(side)].lines.is_some()
    }

    fn stamp(&self, generation: u64) -> JobStamp {
        JobStamp {
            epoch: self.epoch,
            generation,
            file_path: self.file_path.clone(),
        }
    }

    fn rebuild_gaps(&mut self) {
        let gaps = match &self.original {
            Some(lines) => compute_gap_map(&self.hunks, lines),
            None => Default::default(),
        };
        let mut controller =
            GapExpansionController::default().with_step(self.options.expand_step);
        controller.reset(gaps, self.gap_epoch, self.file_path.clone());
        self.gaps = controller;
    }

    /// Swap in a new hunk set for the same file.
    ///
    /// Token streams, reveal state and gap caches are dropped, and every job
    /// still in flight will be rejected on commit.
    pub fn set_hunks(&mut self, hunks: Vec<Hunk>) {
        self.hunks = hunks;
        self.epoch += 1;
        self.gap_epoch += 1;
        for side in &mut self.sides {
            side.lines = None;
        }
        self.rebuild_gaps();
        log::debug!("hunks replaced, epoch {}", self.epoch);
    }

    /// Replace the old file, keeping the hunks.
    ///
    /// Gaps are recomputed and in-flight gap jobs rejected; whole-diff tokens
    /// and their pending jobs stay valid.
    pub fn set_original(&mut self, text: Option<&str>) {
        self.original = text.map(file_lines);
        self.gap_epoch += 1;
        self.rebuild_gaps();
    }

    /// Start whole-diff tokenization of both sides.
    ///
    /// Cached sides are filled in immediately; the rest come back as jobs.
    /// Nothing is requested when the language is unknown or the diff is over
    /// the line ceiling.
    pub fn request_highlighting(&mut self) -> Vec<TokenJob> {
        let Some(highlighter) = self.highlighter.clone() else {
            return Vec::new();
        };
        let total: usize = self.hunks.iter().map(|h| h.lines.len()).sum();
        if total > self.options.highlight_line_limit {
            log::debug!(
                "skipping highlighting: {total} lines over limit {}",
                self.options.highlight_line_limit
            );
            return Vec::new();
        }

        let mut jobs = Vec::new();
        for side in [Side::Old, Side::New] {
            let lines = side_lines(&self.hunks, side);
            let generation = {
                let slot = &mut self.sides[side_index(side)];
                slot.generation += 1;
                slot.generation
            };
            if lines.is_empty() {
                self.sides[side_index(side)].lines = Some(Vec::new());
                continue;
            }

            let run = CodeRun::from_lines(0, &lines);
            let stamp = self.stamp(generation);
            let (hits, job) = highlighter.dispatch(stamp, TokenTarget::Diff(side), vec![run]);
            if let Some((_, tokens)) = hits.into_iter().next() {
                self.sides[side_index(side)].lines = Some(tokens);
            }
            jobs.extend(job);
        }
        jobs
    }

    /// Reveal part of a gap; returns a job when new lines need tokens
    pub fn expand(&mut self, key: GapKey, action: GapAction) -> Option<TokenJob> {
        self.gaps.expand(key, action, self.highlighter.as_ref())
    }

    /// Fully reveal every gap
    pub fn expand_all(&mut self) -> Vec<TokenJob> {
        let keys: Vec<GapKey> = self.gaps.gaps().iter().map(|(key, _)| key).collect();
        keys.into_iter()
            .filter_map(|key| self.expand(key, GapAction::All))
            .collect()
    }

    /// Apply a finished job.
    ///
    /// Returns `false` and changes nothing when the batch is stale or empty.
    pub fn commit(&mut self, batch: TokenBatch) -> bool {
        let side = match batch.target {
            TokenTarget::Gap(_) => return self.gaps.commit(batch),
            TokenTarget::Diff(side) => side,
        };
        let slot = &mut self.sides[side_index(side)];
        if batch.stamp.epoch != self.epoch
            || batch.stamp.file_path != self.file_path
            || batch.stamp.generation != slot.generation
        {
            log::debug!("discarding stale {side:?} tokens");
            return false;
        }
        match batch.results.into_iter().next() {
            Some((_, lines)) => {
                slot.lines = Some(lines);
                true
            }
            None => false,
        }
    }

    /// Old-to-new line offset for the lines of a gap
    fn line_delta(&self, key: GapKey) -> isize {
        let (old, new) = match key {
            GapKey::Before(idx) => match self.hunks.get(idx) {
                Some(h) => (h.old_start, h.new_start),
                None => return 0,
            },
            GapKey::Trailing => match self.hunks.last() {
                Some(h) => (h.old_end(), h.new_end()),
                None => return 0,
            },
        };
        new as isize - old as isize
    }

    fn gap_rows<L>(&self, key: GapKey, make: impl Fn(GapLine<'_>) -> L) -> Vec<Row<L>> {
        let Some(gap) = self.gaps.gaps().get(key) else {
            return Vec::new();
        };
        let total = gap.len();
        let reveal = self.gaps.reveal(key);
        let cache = self.gaps.expansion(key).map(|e| &e.tokens);
        let delta = self.line_delta(key);
        let hunk_index = match key {
            GapKey::Before(idx) => idx,
            GapKey::Trailing => self.hunks.len().saturating_sub(1),
        };

        let revealed = |i: usize| {
            let old_num = gap.line_number(i);
            Row::Revealed {
                key,
                line: make(GapLine {
                    text: &gap.lines[i],
                    old_num,
                    new_num: shift(old_num, delta),
                    tokens: cache.and_then(|c| c.get(&i)).map(Vec::as_slice),
                    hunk_index,
                }),
            }
        };

        let mut rows: Vec<Row<L>> = reveal.top_range(total).map(&revealed).collect();
        if let Some(affordance) = reveal.affordance(total, self.gaps.step()) {
            rows.push(Row::Gap(GapMarker {
                key,
                hidden: affordance.hidden(),
                affordance,
            }));
        }
        rows.extend(reveal.bottom_range(total).map(&revealed));
        rows
    }

    /// Interleave hunk rows with the gaps around them
    fn assemble<L: Clone + HunkTagged>(
        &self,
        entries: &[L],
        make: impl Fn(GapLine<'_>) -> L,
    ) -> Vec<Row<L>> {
        let mut rows = Vec::with_capacity(entries.len() + 2 * self.gaps.gaps().len());
        let mut groups = group_by_hunk(entries).into_iter().peekable();
        for idx in 0..self.hunks.len() {
            rows.extend(self.gap_rows(GapKey::Before(idx), &make));
            while let Some(group) = groups.next_if(|g| g.hunk_index == idx) {
                rows.extend(group.entries.iter().cloned().map(Row::Line));
            }
        }
        for group in groups {
            rows.extend(group.entries.iter().cloned().map(Row::Line));
        }
        rows.extend(self.gap_rows(GapKey::Trailing, &make));
        rows
    }

    pub fn render(&self, view_mode: ViewMode) -> RenderModel {
        let old = Tokens::from_option(self.sides[0].lines.as_deref());
        let new = Tokens::from_option(self.sides[1].lines.as_deref());

        match view_mode {
            ViewMode::Unified => {
                let lines = build_unified(&self.hunks, old, new, self.word_diff.as_ref());
                RenderModel::Unified(self.assemble(&lines, |g| {
                    DiffLineEntry {
                        old_num: Some(g.old_num),
                        new_num: Some(g.new_num),
                        prefix: LineKind::Context.prefix(),
                        content: fuse_line(g.text, g.tokens),
                        kind: LineKind::Context,
                        hunk_index: g.hunk_index,
                    }
                }))
            }
            ViewMode::Split => {
                let rows = build_split(&self.hunks, old, new, self.word_diff.as_ref()).into_rows();
                RenderModel::Split(self.assemble(&rows, |g| {
                    let content: Vec<Fragment> = fuse_line(g.text, g.tokens);
                    let cell = |num| SplitLineEntry {
                        content: content.clone(),
                        kind: SplitKind::Context,
                        num: Some(num),
                        hunk_index: g.hunk_index,
                    };
                    SplitRow {
                        left: cell(g.old_num),
                        right: cell(g.new_num),
                    }
                }))
            }
        }
    }
}

/// Render `hunks` once, without highlighting.
///
/// Gaps appear as collapsed separators when `original_text` is given.
pub fn render(
    hunks: &[Hunk],
    view_mode: ViewMode,
    file_path: Option<&str>,
    original_text: Option<&str>,
) -> RenderModel {
    let mut renderer = DiffRenderer::new(hunks.to_vec());
    if let Some(path) = file_path {
        renderer = renderer.with_file_path(path);
    }
    if let Some(text) = original_text {
        renderer = renderer.with_original(text);
    }
    renderer.render(view_mode)
}
