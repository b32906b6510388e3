//! Unified diff parsing

use crate::hunk::{Hunk, LineKind};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Malformed hunk header on line {line}: {header}")]
    BadHeader { line: usize, header: String },
    #[error("Hunk starting on line {line} ends early ({old} old and {new} new lines missing)")]
    Truncated { line: usize, old: usize, new: usize },
}

/// The hunks of one file in a patch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilePatch {
    /// `None` for a created file (`/dev/null`)
    pub old_path: Option<String>,
    /// `None` for a deleted file (`/dev/null`)
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// The path the file is best known by: the new one, or the old one when
    /// the file was deleted
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }

    pub fn matches(&self, path: &str) -> bool {
        self.new_path.as_deref() == Some(path) || self.old_path.as_deref() == Some(path)
    }

    pub fn additions(&self) -> usize {
        self.hunks.iter().map(Hunk::additions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.hunks.iter().map(Hunk::deletions).sum()
    }

    fn from_git_line(line: &str) -> Self {
        let rest = line.trim_start_matches("diff --git ");
        let (old, new) = match rest.split_once(" b/") {
            Some((old, new)) => (old, new),
            None => (rest, rest),
        };
        Self {
            old_path: clean_path(old),
            new_path: clean_path(new),
            hunks: Vec::new(),
        }
    }
}

/// Strip `a/`/`b/` prefixes and trailing timestamps; `/dev/null` is no path
fn clean_path(raw: &str) -> Option<String> {
    let path = raw.split('\t').next().unwrap_or(raw).trim();
    if path.is_empty() || path == "/dev/null" {
        return None;
    }
    let path = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path);
    Some(path.to_string())
}

/// Parse `@@ -old_start[,old_count] +new_start[,new_count] @@ [section]`.
///
/// Missing counts default to 1.
fn parse_hunk_header(header: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = header.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let mut parts = rest[..end].split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    if parts.next().is_some() {
        return None;
    }

    let range = |part: &str| -> Option<(usize, usize)> {
        match part.split_once(',') {
            Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
            None => Some((part.parse().ok()?, 1)),
        }
    };
    let (old_start, old_lines) = range(old)?;
    let (new_start, new_lines) = range(new)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn is_no_newline_marker(line: &str) -> bool {
    line.starts_with('\\')
}

/// Parse a unified diff, git-style or plain, into per-file hunks.
///
/// Metadata lines (`index`, modes, renames) are skipped. Hunks with no file
/// header at all are collected into one anonymous [`FilePatch`].
pub fn parse_patch(text: &str) -> Result<Vec<FilePatch>, PatchError> {
    let mut files: Vec<FilePatch> = Vec::new();
    let mut current: Option<FilePatch> = None;
    // '\n' only: CRLF hunk lines keep their '\r'
    let mut lines = text
        .split_inclusive('\n')
        .map(|line| line.strip_suffix('\n').unwrap_or(line))
        .enumerate()
        .peekable();

    while let Some((idx, line)) = lines.next() {
        if line.starts_with("diff --git ") {
            files.extend(current.take());
            current = Some(FilePatch::from_git_line(line));
        } else if let Some(path) = line.strip_prefix("--- ") {
            if current.as_ref().map_or(true, |file| !file.hunks.is_empty()) {
                files.extend(current.take());
                current = Some(FilePatch::default());
            }
            if let Some(file) = current.as_mut() {
                file.old_path = clean_path(path);
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            current.get_or_insert_with(FilePatch::default).new_path = clean_path(path);
        } else if line.starts_with("@@") {
            let (old_start, old_lines, new_start, new_lines) =
                parse_hunk_header(line).ok_or_else(|| PatchError::BadHeader {
                    line: idx + 1,
                    header: line.to_string(),
                })?;
            let mut hunk = Hunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                lines: Vec::new(),
            };

            let mut old_left = old_lines;
            let mut new_left = new_lines;
            while old_left > 0 || new_left > 0 {
                let Some((_, body)) = lines.next() else {
                    return Err(PatchError::Truncated {
                        line: idx + 1,
                        old: old_left,
                        new: new_left,
                    });
                };
                if is_no_newline_marker(body) {
                    continue;
                }
                // Some tools strip the space off blank context lines
                let body = match body {
                    "" => " ",
                    "\r" => " \r",
                    other => other,
                };
                match LineKind::split(body).0 {
                    LineKind::Context => {
                        old_left = old_left.saturating_sub(1);
                        new_left = new_left.saturating_sub(1);
                    }
                    LineKind::Removed => old_left = old_left.saturating_sub(1),
                    LineKind::Added => new_left = new_left.saturating_sub(1),
                }
                hunk.lines.push(body.to_string());
            }
            lines.next_if(|(_, next)| is_no_newline_marker(next));

            current.get_or_insert_with(FilePatch::default).hunks.push(hunk);
        }
    }

    files.extend(current);
    log::debug!("parsed patch with {} file(s)", files.len());
    Ok(files)
}

/// Hunks of a single-file patch (the first file when there are several)
pub fn parse_hunks(text: &str) -> Result<Vec<Hunk>, PatchError> {
    Ok(parse_patch(text)?
        .into_iter()
        .next()
        .map(|file| file.hunks)
        .unwrap_or_default())
}
