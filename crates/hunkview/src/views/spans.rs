//! Fragment and separator styling shared by both layouts

use crate::color::token_style;
use crate::config::ResolvedTheme;
use hunkview_core::{Fragment, GapAffordance, GapMarker, Highlight, LineKind, SplitKind};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

/// Base style of a line by what happened to it
pub fn kind_style(kind: LineKind, theme: &ResolvedTheme) -> Style {
    match kind {
        LineKind::Added => Style::default().fg(theme.added),
        LineKind::Removed => Style::default().fg(theme.removed),
        LineKind::Context => Style::default().fg(theme.text),
    }
}

pub fn split_kind_style(kind: SplitKind, theme: &ResolvedTheme) -> Style {
    match kind {
        SplitKind::Added => kind_style(LineKind::Added, theme),
        SplitKind::Removed => kind_style(LineKind::Removed, theme),
        SplitKind::Context | SplitKind::Empty => kind_style(LineKind::Context, theme),
    }
}

/// Spans for a fused line; syntax colors win over the line color, word
/// changes get a background
pub fn fragment_spans(
    fragments: &[Fragment],
    base: Style,
    theme: &ResolvedTheme,
) -> Vec<Span<'static>> {
    fragments
        .iter()
        .filter(|f| !f.text.is_empty())
        .map(|fragment| {
            let mut style = match &fragment.style {
                Some(token) => base.patch(token_style(token)),
                None => base,
            };
            match fragment.highlight {
                Some(Highlight::Added) => {
                    style = style.bg(theme.word_added).add_modifier(Modifier::BOLD);
                }
                Some(Highlight::Removed) => {
                    style = style.bg(theme.word_removed).add_modifier(Modifier::BOLD);
                }
                None => {}
            }
            Span::styled(expand_tabs(&fragment.text), style)
        })
        .collect()
}

/// Label for a collapsed gap
pub fn gap_label(marker: &GapMarker) -> String {
    let lines = if marker.hidden == 1 { "line" } else { "lines" };
    match marker.affordance {
        GapAffordance::ExpandAll { .. } => {
            format!("⋯ {} hidden {lines} (enter: show)", marker.hidden)
        }
        GapAffordance::Edges { .. } => format!(
            "⋯ {} hidden {lines} ([: from top, ]: from bottom, enter: all)",
            marker.hidden
        ),
    }
}

pub fn gap_line(marker: &GapMarker, theme: &ResolvedTheme) -> Line<'static> {
    Line::from(Span::styled(
        gap_label(marker),
        Style::default()
            .fg(theme.gap)
            .add_modifier(Modifier::ITALIC),
    ))
}

pub fn line_number(num: Option<usize>) -> String {
    match num {
        Some(n) => format!("{n:>4}"),
        None => "    ".to_string(),
    }
}

pub fn expand_tabs(text: &str) -> String {
    text.replace('\t', "    ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunkview_core::{GapKey, TokenStyle};
    use ratatui::style::Color;

    #[test]
    fn test_word_highlight_background() {
        let theme = ResolvedTheme::default();
        let fragments = vec![
            Fragment::plain("let x = "),
            Fragment {
                text: "2".into(),
                style: Some(TokenStyle::fg(9, 9, 9)),
                highlight: Some(Highlight::Added),
            },
            Fragment::plain(""),
        ];
        let spans = fragment_spans(&fragments, kind_style(LineKind::Added, &theme), &theme);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].style.fg, Some(theme.added));
        assert_eq!(spans[0].style.bg, None);
        assert_eq!(spans[1].style.fg, Some(Color::Rgb(9, 9, 9)));
        assert_eq!(spans[1].style.bg, Some(theme.word_added));
    }

    #[test]
    fn test_gap_labels() {
        let edges = GapMarker {
            key: GapKey::Before(0),
            hidden: 40,
            affordance: GapAffordance::Edges { hidden: 40 },
        };
        assert!(gap_label(&edges).starts_with("⋯ 40 hidden lines ("));
        let one = GapMarker {
            key: GapKey::Trailing,
            hidden: 1,
            affordance: GapAffordance::ExpandAll { hidden: 1 },
        };
        assert_eq!(gap_label(&one), "⋯ 1 hidden line (enter: show)");
    }

    #[test]
    fn test_line_number_padding() {
        assert_eq!(line_number(Some(7)), "   7");
        assert_eq!(line_number(None), "    ");
        assert_eq!(expand_tabs("\tx"), "    x");
    }
}
