//! Application state and logic

use crate::config::ResolvedTheme;
use hunkview_core::{DiffRenderer, GapAction, GapKey, RenderModel, Row, TokenBatch, ViewMode};
use tokio::sync::mpsc;

mod tokens;


/// The main application state
pub struct App {
    renderer: DiffRenderer,
    /// Rows for the current view mode, rebuilt after every state change
    model: RenderModel,
    /// Current view mode
    pub view_mode: ViewMode,
    /// Row the cursor is on
    pub cursor: usize,
    /// Current scroll offset
    pub scroll_offset: usize,
    /// Body height at the last draw
    pub viewport_height: usize,
    /// Show line number gutters
    pub line_numbers: bool,
    pub theme: ResolvedTheme,
    /// Transient message for the status bar
    pub status: Option<String>,
    pub show_help: bool,
    pub should_quit: bool,
    token_tx: mpsc::UnboundedSender<TokenBatch>,
    token_rx: mpsc::UnboundedReceiver<TokenBatch>,
    /// Token jobs spawned and not yet reported back
    pending_jobs: usize,
}

impl App {
    pub fn new(renderer: DiffRenderer, view_mode: ViewMode, line_numbers: bool) -> Self {
        let (token_tx, token_rx) = mpsc::unbounded_channel();
        let model = renderer.render(view_mode);
        Self {
            renderer,
            model,
            view_mode,
            cursor: 0,
            scroll_offset: 0,
            viewport_height: 0,
            line_numbers,
            theme: ResolvedTheme::default(),
            status: None,
            show_help: false,
            should_quit: false,
            token_tx,
            token_rx,
            pending_jobs: 0,
        }
    }

    pub fn with_theme(mut self, theme: ResolvedTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn renderer(&self) -> &DiffRenderer {
        &self.renderer
    }

    pub fn model(&self) -> &RenderModel {
        &self.model
    }

    pub fn total_rows(&self) -> usize {
        self.model.len()
    }

    /// (additions, deletions) across all hunks
    pub fn stats(&self) -> (usize, usize) {
        self.renderer
            .hunks()
            .iter()
            .fold((0, 0), |(add, del), h| (add + h.additions(), del + h.deletions()))
    }

    fn rebuild(&mut self) {
        self.model = self.renderer.render(self.view_mode);
        self.cursor = self.cursor.min(self.total_rows().saturating_sub(1));
    }

    pub fn toggle_view(&mut self) {
        let key = self.model.gap_key(self.cursor);
        self.view_mode = self.view_mode.toggle();
        self.rebuild();
        if let Some(key) = key {
            self.focus_gap(key);
        }
    }

    // ------------------------------------------------------------------
    // Cursor and scrolling
    // ------------------------------------------------------------------

    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.total_rows().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    pub fn cursor_top(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_bottom(&mut self) {
        self.cursor = self.total_rows().saturating_sub(1);
    }

    pub fn page_down(&mut self) {
        self.move_cursor(self.viewport_height.max(1) as isize);
    }

    pub fn page_up(&mut self) {
        self.move_cursor(-(self.viewport_height.max(1) as isize));
    }

    /// Scroll just enough to keep the cursor inside the viewport
    pub fn ensure_cursor_visible(&mut self, viewport_height: usize) {
        self.viewport_height = viewport_height;
        if viewport_height == 0 {
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor + 1 - viewport_height;
        }
        let max_scroll = self.total_rows().saturating_sub(viewport_height);
        self.scroll_offset = self.scroll_offset.min(max_scroll);
    }

    /// Jump to the next separator row after the cursor
    pub fn next_gap(&mut self) {
        let next = self.gap_rows().find(|&idx| idx > self.cursor);
        if let Some(idx) = next {
            self.cursor = idx;
        }
    }

    /// Jump to the previous separator row before the cursor
    pub fn prev_gap(&mut self) {
        let prev = self.gap_rows().filter(|&idx| idx < self.cursor).last();
        if let Some(idx) = prev {
            self.cursor = idx;
        }
    }

    fn gap_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.total_rows()).filter(|&idx| self.is_separator(idx))
    }

    fn is_separator(&self, idx: usize) -> bool {
        match &self.model {
            RenderModel::Unified(rows) => matches!(rows.get(idx), Some(Row::Gap(_))),
            RenderModel::Split(rows) => matches!(rows.get(idx), Some(Row::Gap(_))),
        }
    }

    /// Put the cursor on `key`'s separator, or on its first revealed line
    /// once the separator is gone
    fn focus_gap(&mut self, key: GapKey) {
        let mut first = None;
        for idx in 0..self.total_rows() {
            if self.model.gap_key(idx) != Some(key) {
                continue;
            }
            if self.is_separator(idx) {
                self.cursor = idx;
                return;
            }
            first.get_or_insert(idx);
        }
        if let Some(idx) = first {
            self.cursor = idx;
        }
    }

    // ------------------------------------------------------------------
    // Gap expansion
    // ------------------------------------------------------------------

    pub fn gap_under_cursor(&self) -> Option<GapKey> {
        self.model.gap_key(self.cursor)
    }

    /// Apply `action` to the gap under the cursor
    pub fn expand_at_cursor(&mut self, action: GapAction) {
        let Some(key) = self.gap_under_cursor() else {
            self.status = Some("No hidden context here".to_string());
            return;
        };
        if self.renderer.gaps().hidden(key) == 0 {
            self.status = Some("Gap already fully expanded".to_string());
            return;
        }
        let job = self.renderer.expand(key, action);
        self.spawn_jobs(job);
        self.status = None;
        self.rebuild();
        self.focus_gap(key);
    }

    pub fn expand_all(&mut self) {
        let jobs = self.renderer.expand_all();
        self.spawn_jobs(jobs);
        self.rebuild();
    }
}
