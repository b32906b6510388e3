//! Non-interactive output: the render model written straight to a stream

use crossterm::style::{Attribute, Color, ContentStyle, StyledContent};
use hunkview_core::{
    Fragment, GapMarker, Highlight, LineKind, RenderModel, Row, SplitKind, SplitLineEntry,
};
use std::io::{self, Write};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Column gap between the two halves of a split row
const SPLIT_DIVIDER: &str = " │ ";

pub struct Printer {
    /// Emit ANSI styling
    pub color: bool,
    /// Total output width, used to size split columns
    pub width: usize,
}

impl Printer {
    pub fn print(&self, model: &RenderModel, out: &mut impl Write) -> io::Result<()> {
        match model {
            RenderModel::Unified(rows) => {
                for row in rows {
                    match row {
                        Row::Line(entry) | Row::Revealed { line: entry, .. } => {
                            let base = kind_style(entry.kind);
                            let numbers = format!(
                                "{} {} ",
                                number(entry.old_num),
                                number(entry.new_num)
                            );
                            self.write(out, &numbers, dim())?;
                            self.write(out, &format!("{} ", entry.prefix), base)?;
                            self.write_fragments(out, &entry.content, base, usize::MAX)?;
                        }
                        Row::Gap(marker) => self.write_gap(out, marker)?,
                    }
                    writeln!(out)?;
                }
            }
            RenderModel::Split(rows) => {
                let column = self
                    .width
                    .saturating_sub(SPLIT_DIVIDER.len() + 10)
                    .max(20)
                    / 2;
                for row in rows {
                    match row {
                        Row::Line(split) | Row::Revealed { line: split, .. } => {
                            self.write_cell(out, &split.left, column, true)?;
                            self.write(out, SPLIT_DIVIDER, dim())?;
                            self.write_cell(out, &split.right, column, false)?;
                        }
                        Row::Gap(marker) => self.write_gap(out, marker)?,
                    }
                    writeln!(out)?;
                }
            }
        }
        out.flush()
    }

    fn write(&self, out: &mut impl Write, text: &str, style: ContentStyle) -> io::Result<()> {
        if self.color && style != ContentStyle::default() {
            write!(out, "{}", StyledContent::new(style, text))
        } else {
            out.write_all(text.as_bytes())
        }
    }

    fn write_gap(&self, out: &mut impl Write, marker: &GapMarker) -> io::Result<()> {
        let lines = if marker.hidden == 1 { "line" } else { "lines" };
        let mut style = ContentStyle::new();
        style.foreground_color = Some(Color::Cyan);
        style.attributes.set(Attribute::Italic);
        self.write(
            out,
            &format!("{:>9} ⋯ {} hidden {lines} ⋯", "", marker.hidden),
            style,
        )
    }

    /// Write fragments up to `budget` columns; returns the columns used
    fn write_fragments(
        &self,
        out: &mut impl Write,
        fragments: &[Fragment],
        base: ContentStyle,
        budget: usize,
    ) -> io::Result<usize> {
        let mut used = 0;
        for fragment in fragments {
            let text = fragment.text.replace('\t', "    ");
            let text = clip(&text, budget.saturating_sub(used));
            if text.is_empty() {
                continue;
            }
            let mut style = base;
            if let Some(token) = &fragment.style {
                if let Some(fg) = token.foreground {
                    style.foreground_color = Some(Color::Rgb {
                        r: fg.0,
                        g: fg.1,
                        b: fg.2,
                    });
                }
                if token.bold {
                    style.attributes.set(Attribute::Bold);
                }
                if token.italic {
                    style.attributes.set(Attribute::Italic);
                }
            }
            match fragment.highlight {
                Some(Highlight::Added) => style.background_color = Some(Color::DarkGreen),
                Some(Highlight::Removed) => style.background_color = Some(Color::DarkRed),
                None => {}
            }
            used += text.width();
            self.write(out, text, style)?;
        }
        Ok(used)
    }

    fn write_cell(
        &self,
        out: &mut impl Write,
        cell: &SplitLineEntry,
        column: usize,
        pad: bool,
    ) -> io::Result<()> {
        let base = match cell.kind {
            SplitKind::Added => kind_style(LineKind::Added),
            SplitKind::Removed => kind_style(LineKind::Removed),
            SplitKind::Context | SplitKind::Empty => ContentStyle::default(),
        };
        self.write(out, &format!("{} ", number(cell.num)), dim())?;
        let used = self.write_fragments(out, &cell.content, base, column)?;
        if pad {
            write!(out, "{}", " ".repeat(column.saturating_sub(used)))?;
        }
        Ok(())
    }
}

fn kind_style(kind: LineKind) -> ContentStyle {
    let mut style = ContentStyle::new();
    style.foreground_color = match kind {
        LineKind::Added => Some(Color::Green),
        LineKind::Removed => Some(Color::Red),
        LineKind::Context => None,
    };
    style
}

fn dim() -> ContentStyle {
    let mut style = ContentStyle::new();
    style.foreground_color = Some(Color::DarkGrey);
    style
}

fn number(num: Option<usize>) -> String {
    match num {
        Some(n) => format!("{n:>4}"),
        None => "    ".to_string(),
    }
}

/// Longest prefix of `text` at most `width` columns wide
fn clip(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in text.char_indices() {
        used += ch.width().unwrap_or(0);
        if used > width {
            return &text[..idx];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunkview_core::{render, Hunk, ViewMode};

    fn hunks() -> Vec<Hunk> {
        vec![Hunk {
            old_start: 3,
            old_lines: 2,
            new_start: 3,
            new_lines: 2,
            lines: vec![" c".into(), "-d".into(), "+D".into()],
        }]
    }

    fn original() -> String {
        "a\nb\nc\nd\ne\n".to_string()
    }

    fn printed(model: &RenderModel, color: bool) -> String {
        let printer = Printer { color, width: 60 };
        let mut out = Vec::new();
        printer.print(model, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_unified_output() {
        let model = render(&hunks(), ViewMode::Unified, None, Some(&original()));
        let text = printed(&model, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].trim(), "⋯ 2 hidden lines ⋯");
        assert_eq!(lines[1], "   3    3   c");
        assert_eq!(lines[2], "   4      - d");
        assert_eq!(lines[3], "        4 + D");
        assert_eq!(lines[4].trim(), "⋯ 1 hidden line ⋯");
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_split_output_pads_left_column() {
        let model = render(&hunks(), ViewMode::Split, None, None);
        let text = printed(&model, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let divider = lines[1].find('│').unwrap();
        assert_eq!(lines[0].find('│'), Some(divider));
        assert!(lines[1].starts_with("   4 d"));
        assert!(lines[1].ends_with("   4 D"));
    }

    #[test]
    fn test_color_output_has_escapes() {
        let model = render(&hunks(), ViewMode::Unified, None, None);
        assert!(printed(&model, true).contains('\x1b'));
    }

    #[test]
    fn test_clip_respects_width() {
        assert_eq!(clip("hello", 3), "hel");
        assert_eq!(clip("日本語", 4), "日本");
        assert_eq!(clip("ok", 10), "ok");
    }
}
