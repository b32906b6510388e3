//! Split view: old file on the left, new file on the right

use super::spans::{fragment_spans, gap_line, line_number, split_kind_style};
use crate::app::App;
use crate::config::ResolvedTheme;
use hunkview_core::{RenderModel, Row, SplitKind, SplitLineEntry, SplitRow};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Width of the fixed line number gutter
const GUTTER_WIDTH: u16 = 5; // "1234 "

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pane {
    Old,
    New,
}

/// Render the split view
pub fn render_split(frame: &mut Frame, app: &mut App, area: Rect) {
    let visible_height = area.height as usize;
    app.ensure_cursor_visible(visible_height);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Length(1), // Divider
            Constraint::Percentage(50),
        ])
        .split(area);

    render_pane(frame, app, chunks[0], Pane::Old);
    let divider: Vec<Line> = (0..visible_height)
        .map(|_| Line::from(Span::styled("│", Style::default().fg(app.theme.text_muted))))
        .collect();
    frame.render_widget(Paragraph::new(divider), chunks[1]);
    render_pane(frame, app, chunks[2], Pane::New);
}

fn render_pane(frame: &mut Frame, app: &App, area: Rect, pane: Pane) {
    let RenderModel::Split(rows) = app.model() else {
        return;
    };
    let theme = &app.theme;
    let visible_height = area.height as usize;
    let gutter_width = if app.line_numbers { GUTTER_WIDTH } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(gutter_width), Constraint::Min(0)])
        .split(area);

    let mut gutter_lines: Vec<Line> = Vec::with_capacity(visible_height);
    let mut content_lines: Vec<Line> = Vec::with_capacity(visible_height);

    for (idx, row) in rows
        .iter()
        .enumerate()
        .skip(app.scroll_offset)
        .take(visible_height)
    {
        let (mut gutter, mut content) = match row {
            Row::Line(split) => cell_lines(side(split, pane), theme, false),
            Row::Revealed { line, .. } => cell_lines(side(line, pane), theme, true),
            Row::Gap(marker) => {
                let gutter = Line::from(Span::styled(
                    format!("{:>4} ", "⋯"),
                    Style::default().fg(theme.gap),
                ));
                let content = match pane {
                    Pane::Old => gap_line(marker, theme),
                    Pane::New => Line::from(""),
                };
                (gutter, content)
            }
        };
        if idx == app.cursor {
            let cursor = Style::default().bg(theme.cursor);
            gutter = gutter.style(cursor);
            content = content.style(cursor);
        }
        gutter_lines.push(gutter);
        content_lines.push(content);
    }

    if app.line_numbers {
        frame.render_widget(Paragraph::new(gutter_lines), chunks[0]);
    }
    frame.render_widget(Paragraph::new(content_lines), chunks[1]);
}

fn side(row: &SplitRow, pane: Pane) -> &SplitLineEntry {
    match pane {
        Pane::Old => &row.left,
        Pane::New => &row.right,
    }
}

fn cell_lines(
    entry: &SplitLineEntry,
    theme: &ResolvedTheme,
    revealed: bool,
) -> (Line<'static>, Line<'static>) {
    if entry.kind == SplitKind::Empty {
        return (Line::from("     "), Line::from(""));
    }
    let number_style = Style::default().fg(if revealed {
        theme.text_muted
    } else {
        theme.line_number
    });
    let gutter = Line::from(vec![
        Span::styled(line_number(entry.num), number_style),
        Span::raw(" "),
    ]);
    let base = split_kind_style(entry.kind, theme);
    (gutter, Line::from(fragment_spans(&entry.content, base, theme)))
}
