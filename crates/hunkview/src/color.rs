//! Color parsing and blending for themes and syntax tokens

use hunkview_core::TokenStyle;
use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

/// RGB color (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parse hex color string (e.g., "#2ecc71" or "2ecc71")
pub fn parse_hex(s: &str) -> Result<Rgb, String> {
    let s = s.trim().trim_start_matches('#');
    if s.len() != 6 || !s.is_ascii() {
        return Err(format!("invalid hex color: expected 6 hex digits, got '{s}'"));
    }

    let channel = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&s[range], 16)
            .map_err(|_| format!("invalid hex color: bad {name} component in '{s}'"))
    };
    Ok(Rgb {
        r: channel(0..2, "red")?,
        g: channel(2..4, "green")?,
        b: channel(4..6, "blue")?,
    })
}

/// Parse ANSI color name to ratatui Color
pub fn parse_ansi_name(name: &str) -> Option<Color> {
    match name.to_lowercase().replace('-', "_").as_str() {
        "default" | "reset" | "transparent" => Some(Color::Reset),
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "light_red" | "lightred" => Some(Color::LightRed),
        "light_green" | "lightgreen" => Some(Color::LightGreen),
        "light_yellow" | "lightyellow" => Some(Color::LightYellow),
        "light_blue" | "lightblue" => Some(Color::LightBlue),
        "light_magenta" | "lightmagenta" => Some(Color::LightMagenta),
        "light_cyan" | "lightcyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

/// Resolve a color string: def reference, hex, or ANSI name
pub fn resolve_color(value: &str, defs: &HashMap<String, String>) -> Option<Color> {
    let value = value.trim();

    if let Some(hex) = defs.get(value) {
        return parse_hex(hex).ok().map(|rgb| Color::Rgb(rgb.r, rgb.g, rgb.b));
    }
    if value.starts_with('#') {
        return parse_hex(value)
            .ok()
            .map(|rgb| Color::Rgb(rgb.r, rgb.g, rgb.b));
    }
    parse_ansi_name(value)
}

/// Approximate RGB for ANSI colors so they can be blended
fn color_to_rgb(color: Color) -> Option<Rgb> {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (205, 0, 0),
        Color::Green => (0, 205, 0),
        Color::Yellow => (205, 205, 0),
        Color::Blue => (0, 0, 238),
        Color::Magenta => (205, 0, 205),
        Color::Cyan => (0, 205, 205),
        Color::Gray => (229, 229, 229),
        Color::DarkGray => (127, 127, 127),
        Color::LightRed => (255, 0, 0),
        Color::LightGreen => (0, 255, 0),
        Color::LightYellow => (255, 255, 0),
        Color::LightBlue => (92, 92, 255),
        Color::LightMagenta => (255, 0, 255),
        Color::LightCyan => (0, 255, 255),
        Color::White => (255, 255, 255),
        _ => return None,
    };
    Some(Rgb { r, g, b })
}

/// Blend two colors using alpha (0.0 = bg, 1.0 = fg).
pub fn blend_colors(bg: Color, fg: Color, alpha: f32) -> Option<Color> {
    let bg = color_to_rgb(bg)?;
    let fg = color_to_rgb(fg)?;
    let a = alpha.clamp(0.0, 1.0);
    let blend = |b: u8, f: u8| -> u8 { (b as f32 * (1.0 - a) + f as f32 * a).round() as u8 };
    Some(Color::Rgb(
        blend(bg.r, fg.r),
        blend(bg.g, fg.g),
        blend(bg.b, fg.b),
    ))
}

/// Ratatui style for a highlighter token
pub fn token_style(style: &TokenStyle) -> Style {
    let mut out = Style::default();
    if let Some(fg) = style.foreground {
        out = out.fg(Color::Rgb(fg.0, fg.1, fg.2));
    }
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.underline {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(
            parse_hex("#2ecc71"),
            Ok(Rgb {
                r: 0x2e,
                g: 0xcc,
                b: 0x71
            })
        );
        assert!(parse_hex("2ecc71").is_ok());
        assert!(parse_hex("#2ecc7").is_err());
        assert!(parse_hex("#zzcc71").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_resolve_color_sources() {
        let mut defs = HashMap::new();
        defs.insert("green1".to_string(), "#A3BE8C".to_string());
        assert_eq!(
            resolve_color("green1", &defs),
            Some(Color::Rgb(0xA3, 0xBE, 0x8C))
        );
        assert_eq!(resolve_color("#000000", &defs), Some(Color::Rgb(0, 0, 0)));
        assert_eq!(resolve_color("dark-gray", &defs), Some(Color::DarkGray));
        assert_eq!(resolve_color("nope", &defs), None);
    }

    #[test]
    fn test_blend_colors() {
        let mid = blend_colors(Color::Rgb(0, 0, 0), Color::Rgb(200, 100, 50), 0.5);
        assert_eq!(mid, Some(Color::Rgb(100, 50, 25)));
        assert_eq!(blend_colors(Color::Reset, Color::Green, 0.5), None);
    }

    #[test]
    fn test_token_style() {
        let style = TokenStyle {
            bold: true,
            ..TokenStyle::fg(1, 2, 3)
        };
        let out = token_style(&style);
        assert_eq!(out.fg, Some(Color::Rgb(1, 2, 3)));
        assert!(out.add_modifier.contains(Modifier::BOLD));
        assert_eq!(token_style(&TokenStyle::default()), Style::default());
    }
}
