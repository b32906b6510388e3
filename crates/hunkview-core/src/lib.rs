//! Hunkview Core - Diff rendering engine
//!
//! Turns a patch (or two raw texts) plus an optional full original file into
//! an ordered, renderable line model: unified or split layouts, word-level
//! highlighting of paired lines fused with syntax tokens, and hidden context
//! gaps that can be revealed incrementally.

pub mod diff;
pub mod fuse;
pub mod gap;
pub mod group;
pub mod hunk;
pub mod line;
pub mod patch;
pub mod render;
pub mod reveal;
pub mod token;

pub use diff::{DiffChunk, ImaraLineDiff, LineDiff, SimilarWordDiff, WordDiff};
pub use fuse::{fragments_text, fuse_line, fuse_segments, Fragment, Highlight, Side};
pub use gap::{compute_gap_map, Gap, GapKey, GapMap};
pub use group::{group_by_hunk, HunkGroup, HunkTagged};
pub use hunk::{raw_diff_to_hunks, raw_diff_to_hunks_with, Hunk, LineKind};
pub use line::{
    build_split, build_unified, DiffLineEntry, SplitKind, SplitLineEntry, SplitLines, SplitRow,
};
pub use patch::{parse_hunks, parse_patch, FilePatch, PatchError};
pub use render::{
    render, DiffRenderer, GapMarker, RenderModel, RenderOptions, Row, ViewMode,
    HIGHLIGHT_LINE_LIMIT,
};
pub use reveal::{
    GapAction, GapAffordance, GapChange, GapExpansion, GapExpansionController, GapReveal,
    EXPAND_STEP,
};
pub use token::{
    CodeRun, Highlighter, LanguageGuesser, Rgb, Token, TokenBatch, TokenJob, TokenLine,
    TokenStyle, TokenTarget, Tokenizer, Tokens,
};
