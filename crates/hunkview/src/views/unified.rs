//! Unified view: one column, old and new line numbers side by side

use super::spans::{fragment_spans, gap_line, kind_style, line_number};
use crate::app::App;
use crate::config::ResolvedTheme;
use hunkview_core::{DiffLineEntry, RenderModel, Row};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Width of the fixed line number gutter
const GUTTER_WIDTH: u16 = 10; // "1234 1234 "

/// Render the unified view
pub fn render_unified(frame: &mut Frame, app: &mut App, area: Rect) {
    let visible_height = area.height as usize;
    app.ensure_cursor_visible(visible_height);

    let RenderModel::Unified(rows) = app.model() else {
        return;
    };
    let theme = &app.theme;
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
            Row::Line(entry) => entry_lines(entry, theme, false),
            Row::Revealed { line, .. } => entry_lines(line, theme, true),
            Row::Gap(marker) => (
                Line::from(Span::styled(
                    format!("{:>9} ", "⋯"),
                    Style::default().fg(theme.gap),
                )),
                gap_line(marker, theme),
            ),
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

fn entry_lines(
    entry: &DiffLineEntry,
    theme: &ResolvedTheme,
    revealed: bool,
) -> (Line<'static>, Line<'static>) {
    let number_style = Style::default().fg(if revealed {
        theme.text_muted
    } else {
        theme.line_number
    });
    let gutter = Line::from(vec![
        Span::styled(line_number(entry.old_num), number_style),
        Span::raw(" "),
        Span::styled(line_number(entry.new_num), number_style),
        Span::raw(" "),
    ]);

    let base = kind_style(entry.kind, theme);
    let mut spans = vec![Span::styled(format!("{} ", entry.prefix), base)];
    spans.extend(fragment_spans(&entry.content, base, theme));
    (gutter, Line::from(spans))
}
