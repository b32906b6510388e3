//! Configuration file support for hv
//!
//! Config file location: `~/.config/hunkview/config.toml` (XDG_CONFIG_HOME)
//!
//! Example config:
//! ```toml
//! [ui]
//! view_mode = "split"
//! syntax = "auto"
//! line_numbers = true
//!
//! [ui.theme]
//! syntax_theme = "base16-ocean.dark"
//!
//! [ui.theme.defs]
//! green1 = "#A3BE8C"
//! red1 = "#BF616A"
//!
//! [ui.theme.colors]
//! added = "green1"
//! removed = "red1"
//! gap = "dark-gray"
//!
//! [render]
//! expand_step = 20
//! highlight_line_limit = 1000
//! ```

use crate::color;
use hunkview_core::{RenderOptions, ViewMode};
use ratatui::style::Color;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

// ============================================================================
// Theme Configuration
// ============================================================================

/// Color overrides; each value is a def name, hex string, or ANSI name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    pub text: Option<String>,
    pub text_muted: Option<String>,
    pub added: Option<String>,
    pub removed: Option<String>,
    /// Background behind changed words on added lines
    pub word_added: Option<String>,
    /// Background behind changed words on removed lines
    pub word_removed: Option<String>,
    pub line_number: Option<String>,
    pub gap: Option<String>,
    pub cursor: Option<String>,
    pub header: Option<String>,
}

/// Theme configuration (defs + colors)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// syntect theme name (e.g., "base16-ocean.dark")
    pub syntax_theme: Option<String>,
    /// Named color definitions (e.g., green1 = "#A3BE8C")
    pub defs: HashMap<String, String>,
    pub colors: ThemeColors,
}

/// Resolved theme, all ratatui Colors ready to use
#[derive(Debug, Clone)]
pub struct ResolvedTheme {
    pub text: Color,
    pub text_muted: Color,
    pub added: Color,
    pub removed: Color,
    pub word_added: Color,
    pub word_removed: Color,
    pub line_number: Color,
    pub gap: Color,
    pub cursor: Color,
    pub header: Color,
}

impl Default for ResolvedTheme {
    fn default() -> Self {
        ThemeConfig::default().resolve()
    }
}

impl ThemeConfig {
    /// Resolve theme config to concrete colors
    pub fn resolve(&self) -> ResolvedTheme {
        let defs = &self.defs;
        let colors = &self.colors;
        let resolve = |value: &Option<String>, fallback: Color| -> Color {
            value
                .as_deref()
                .and_then(|v| color::resolve_color(v, defs))
                .unwrap_or(fallback)
        };

        let added = resolve(&colors.added, Color::Rgb(0x8f, 0xc9, 0x8a));
        let removed = resolve(&colors.removed, Color::Rgb(0xe0, 0x6c, 0x75));
        // Word backgrounds default to the line color pushed toward black
        let base = Color::Rgb(0x1c, 0x1f, 0x24);
        let word_added = colors
            .word_added
            .as_deref()
            .and_then(|v| color::resolve_color(v, defs))
            .or_else(|| color::blend_colors(base, added, 0.35))
            .unwrap_or(Color::Rgb(0x2b, 0x4a, 0x2b));
        let word_removed = colors
            .word_removed
            .as_deref()
            .and_then(|v| color::resolve_color(v, defs))
            .or_else(|| color::blend_colors(base, removed, 0.35))
            .unwrap_or(Color::Rgb(0x5a, 0x2b, 0x2e));

        ResolvedTheme {
            text: resolve(&colors.text, Color::Reset),
            text_muted: resolve(&colors.text_muted, Color::DarkGray),
            added,
            removed,
            word_added,
            word_removed,
            line_number: resolve(&colors.line_number, Color::DarkGray),
            gap: resolve(&colors.gap, Color::Cyan),
            cursor: resolve(&colors.cursor, Color::Rgb(0x2c, 0x31, 0x3a)),
            header: resolve(&colors.header, Color::Blue),
        }
    }
}

/// UI configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Default view mode: "unified" or "split"
    pub view_mode: Option<ViewMode>,
    /// Syntax highlighting: "auto", "on", or "off"
    pub syntax: SyntaxMode,
    /// Show line number gutters
    pub line_numbers: bool,
    pub theme: ThemeConfig,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            view_mode: None,
            syntax: SyntaxMode::Auto,
            line_numbers: true,
            theme: ThemeConfig::default(),
        }
    }
}

/// Syntax highlighting mode
///
/// `auto` highlights diffs under the render line limit, `on` ignores the
/// limit, `off` never highlights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxMode {
    #[default]
    Auto,
    On,
    Off,
}

/// Root configuration
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub render: RenderOptions,
}

impl Config {
    /// Get all possible config file paths in priority order
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("hunkview").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("hunkview").join("config.toml"));
        }

        // ~/Library/Application Support on macOS
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("hunkview").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        paths
    }

    /// Get the first existing config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|p| p.exists())
    }

    /// Load config from XDG config path
    /// Returns default config if file doesn't exist or can't be parsed
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        log::debug!("loading config from {}", path.display());
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| {
                Self::parse(&content)
                    .map_err(|e| {
                        eprintln!("Warning: Failed to parse config: {}", e);
                        e
                    })
                    .ok()
            })
            .unwrap_or_default()
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Render options with the syntax mode folded in
    pub fn render_options(&self) -> RenderOptions {
        let mut options = self.render;
        if self.ui.syntax == SyntaxMode::On {
            options.highlight_line_limit = usize::MAX;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.ui.view_mode, None);
        assert_eq!(config.ui.syntax, SyntaxMode::Auto);
        assert!(config.ui.line_numbers);
        assert_eq!(config.render, RenderOptions::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r##"
[ui]
view_mode = "split"
syntax = "off"
line_numbers = false

[ui.theme]
syntax_theme = "InspiredGitHub"

[ui.theme.defs]
green1 = "#A3BE8C"

[ui.theme.colors]
added = "green1"
gap = "magenta"

[render]
expand_step = 25
"##,
        )
        .unwrap();
        assert_eq!(config.ui.view_mode, Some(ViewMode::Split));
        assert_eq!(config.ui.syntax, SyntaxMode::Off);
        assert!(!config.ui.line_numbers);
        assert_eq!(
            config.ui.theme.syntax_theme.as_deref(),
            Some("InspiredGitHub")
        );
        assert_eq!(config.render.expand_step, 25);
        assert_eq!(
            config.render.highlight_line_limit,
            RenderOptions::default().highlight_line_limit
        );

        let theme = config.ui.theme.resolve();
        assert_eq!(theme.added, Color::Rgb(0xA3, 0xBE, 0x8C));
        assert_eq!(theme.gap, Color::Magenta);
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(Config::parse("[ui]\nview_mode = \"evolution\"\n").is_err());
        assert!(Config::parse("[ui]\nsyntax = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_syntax_on_lifts_line_limit() {
        let config = Config::parse("[ui]\nsyntax = \"on\"\n").unwrap();
        assert_eq!(config.render_options().highlight_line_limit, usize::MAX);
        let config = Config::parse("[ui]\nsyntax = \"auto\"\n").unwrap();
        assert_eq!(
            config.render_options().highlight_line_limit,
            hunkview_core::HIGHLIGHT_LINE_LIMIT
        );
    }

    #[test]
    fn test_unresolvable_color_falls_back() {
        let config = Config::parse("[ui.theme.colors]\nremoved = \"not-a-color\"\n").unwrap();
        let theme = config.ui.theme.resolve();
        assert_eq!(theme.removed, ResolvedTheme::default().removed);
    }
}
