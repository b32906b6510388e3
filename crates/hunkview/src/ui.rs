//! UI rendering for the TUI

use crate::app::App;
use crate::views::{render_split, render_unified};
use hunkview_core::ViewMode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Truncate a path to fit a given width, using /.../ for middle sections
fn truncate_path(path: &str, max_width: usize) -> String {
    if path.width() <= max_width {
        return path.to_string();
    }

    let tail = |s: &str, keep: usize| -> String {
        let chars: Vec<char> = s.chars().collect();
        chars[chars.len().saturating_sub(keep)..].iter().collect()
    };

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() <= 2 {
        return format!("...{}", tail(path, max_width.saturating_sub(3)));
    }

    let first = parts[0];
    let last = parts.last().copied().unwrap_or_default();
    let simple = format!("{}/.../{}", first, last);
    if simple.width() <= max_width {
        return simple;
    }
    format!(".../{}", tail(last, max_width.saturating_sub(4)))
}

/// Main drawing function
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    match app.view_mode {
        ViewMode::Unified => render_unified(frame, app, chunks[0]),
        ViewMode::Split => render_split(frame, app, chunks[0]),
    }
    draw_status_bar(frame, app, chunks[1]);

    if app.show_help {
        draw_help_popover(frame, app);
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let (insertions, deletions) = app.stats();

    let mode = match app.view_mode {
        ViewMode::Unified => " UNIFIED ",
        ViewMode::Split => " SPLIT ",
    };

    let mut right_spans = vec![
        Span::styled(
            format!("+{}", insertions),
            Style::default().fg(theme.added),
        ),
        Span::raw(" "),
        Span::styled(
            format!("-{}", deletions),
            Style::default().fg(theme.removed),
        ),
        Span::raw("  "),
        Span::styled(
            app.renderer().language().unwrap_or("plain").to_string(),
            Style::default().fg(theme.text_muted),
        ),
    ];
    if app.pending_jobs() > 0 {
        right_spans.push(Span::styled(
            " …",
            Style::default().fg(theme.text_muted),
        ));
    }
    right_spans.push(Span::raw(" "));
    let right_width: usize = right_spans.iter().map(|s| s.content.width()).sum();

    let mut left_spans = vec![
        Span::styled(
            mode,
            Style::default()
                .fg(theme.header)
                .add_modifier(Modifier::REVERSED | Modifier::BOLD),
        ),
        Span::raw(" "),
    ];
    let path_budget = (area.width as usize)
        .saturating_sub(mode.len() + 1 + right_width + 1);
    match &app.status {
        Some(status) => left_spans.push(Span::styled(
            truncate_path(status, path_budget),
            Style::default().fg(theme.text),
        )),
        None => {
            let path = app.renderer().file_path().unwrap_or("(stdin)");
            left_spans.push(Span::styled(
                truncate_path(path, path_budget),
                Style::default().fg(theme.text),
            ));
        }
    }
    let left_width: usize = left_spans.iter().map(|s| s.content.width()).sum();
    let padding = (area.width as usize).saturating_sub(left_width + right_width);

    let mut spans = left_spans;
    spans.push(Span::raw(" ".repeat(padding)));
    spans.extend(right_spans);
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_help_popover(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let popup_width = 40u16.min(area.width.saturating_sub(4));
    let popup_height = 14u16.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let key_style = Style::default().fg(app.theme.header);
    let label_style = Style::default().fg(app.theme.text);

    let help_line = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("  {:<12}", key), key_style),
            Span::styled(desc.to_string(), label_style),
        ])
    };

    let lines = vec![
        help_line("j / k / ↑↓", "Move cursor"),
        help_line("g / G", "Go to start/end"),
        help_line("PgUp / PgDn", "Page up/down"),
        help_line("n / N", "Next/prev gap"),
        help_line("Enter", "Show whole gap"),
        help_line("[ / ]", "Grow gap from top/bottom"),
        help_line("e", "Expand every gap"),
        help_line("v", "Toggle unified/split"),
        help_line("?", "Toggle this help"),
        help_line("q / Esc", "Quit"),
    ];

    let block = Block::default()
        .title(" Keys ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.text_muted));
    frame.render_widget(Paragraph::new(lines).block(block), popup_area);
}
