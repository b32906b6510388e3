//! Syntax highlighting service (syntect-backed)

use async_trait::async_trait;
use hunkview_core::{LanguageGuesser, Rgb, Token, TokenLine, TokenStyle, Tokenizer};
use lru::LruCache;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style as SynStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Lines longer than this are left unstyled
const MAX_LINE_LENGTH: usize = 2000;

const CACHE_ENTRIES: usize = 256;

pub struct SyntaxEngine {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntaxEngine {
    pub fn new(theme_name: Option<&str>) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let name = theme_name.unwrap_or(DEFAULT_THEME);
        let theme = match themes.remove(name) {
            Some(theme) => theme,
            None => {
                log::warn!("unknown syntax theme {name:?}, using {DEFAULT_THEME}");
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };
        Self {
            syntax_set: two_face::syntax::extra_newlines(),
            theme,
        }
    }

    fn syntax_for_language(&self, language: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_name(language)
            .or_else(|| self.syntax_set.find_syntax_by_token(language))
    }

    /// Language name for a path, by extension or by whole file name
    /// (`Makefile`, `Dockerfile`)
    pub fn detect_language(&self, path: &str) -> Option<String> {
        let path = Path::new(path);
        let by_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext));
        let syntax = by_ext.or_else(|| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| self.syntax_set.find_syntax_by_extension(name))
        })?;
        if syntax.name == self.syntax_set.find_syntax_plain_text().name {
            return None;
        }
        Some(syntax.name.clone())
    }

    /// One token line per `\n`-separated line of `code`
    pub fn highlight(&self, language: &str, code: &str) -> Option<Vec<TokenLine>> {
        let syntax = self.syntax_for_language(language)?;
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let lines = code
            .split('\n')
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if line.len() > MAX_LINE_LENGTH {
                    return vec![Token::new(line, TokenStyle::default())];
                }
                let with_newline = format!("{line}\n");
                match highlighter.highlight_line(&with_newline, &self.syntax_set) {
                    Ok(ranges) => ranges
                        .into_iter()
                        .filter_map(|(style, text)| {
                            let text = text.strip_suffix('\n').unwrap_or(text);
                            (!text.is_empty()).then(|| Token::new(text, token_style(style)))
                        })
                        .collect(),
                    Err(e) => {
                        log::debug!("syntect failed on a {language} line: {e}");
                        vec![Token::new(line, TokenStyle::default())]
                    }
                }
            })
            .collect();
        Some(lines)
    }
}

fn token_style(style: SynStyle) -> TokenStyle {
    let fg = style.foreground;
    TokenStyle {
        foreground: Some(Rgb(fg.r, fg.g, fg.b)),
        bold: style.font_style.contains(FontStyle::BOLD),
        italic: style.font_style.contains(FontStyle::ITALIC),
        underline: style.font_style.contains(FontStyle::UNDERLINE),
    }
}

fn cache_key(language: &str, code: &str) -> u64 {
    let mut hasher = FxHasher::default();
    language.hash(&mut hasher);
    code.hash(&mut hasher);
    hasher.finish()
}

/// Tokenizer backed by a shared [`SyntaxEngine`] with an LRU of results
#[derive(Clone)]
pub struct SyntectTokenizer {
    engine: Arc<SyntaxEngine>,
    cache: Arc<Mutex<LruCache<u64, Vec<TokenLine>>>>,
}

impl SyntectTokenizer {
    pub fn new(engine: SyntaxEngine) -> Self {
        let capacity = NonZeroUsize::new(CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            engine: Arc::new(engine),
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn remember(&self, key: u64, lines: &[TokenLine]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, lines.to_vec());
        }
    }
}

#[async_trait]
impl Tokenizer for SyntectTokenizer {
    fn cached(&self, language: &str, code: &str) -> Option<Vec<TokenLine>> {
        let key = cache_key(language, code);
        self.cache.lock().ok()?.get(&key).cloned()
    }

    async fn tokenize(&self, language: &str, code: &str) -> Option<Vec<TokenLine>> {
        let key = cache_key(language, code);
        let engine = Arc::clone(&self.engine);
        let language = language.to_string();
        let code = code.to_string();
        let lines = tokio::task::spawn_blocking(move || engine.highlight(&language, &code))
            .await
            .map_err(|e| log::debug!("highlight task failed: {e}"))
            .ok()??;
        self.remember(key, &lines);
        Some(lines)
    }
}

impl LanguageGuesser for SyntectTokenizer {
    fn guess_language(&self, path: &str) -> Option<String> {
        self.engine.detect_language(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> SyntectTokenizer {
        SyntectTokenizer::new(SyntaxEngine::new(None))
    }

    fn line_text(line: &TokenLine) -> String {
        line.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn test_detect_language() {
        let t = tokenizer();
        assert_eq!(t.guess_language("src/main.rs").as_deref(), Some("Rust"));
        assert_eq!(t.guess_language("lib/app.py").as_deref(), Some("Python"));
        assert_eq!(t.guess_language("notes.txt"), None);
        assert_eq!(t.guess_language("data.unknownext"), None);
    }

    #[test]
    fn test_highlight_keeps_lines_and_text() {
        let engine = SyntaxEngine::new(None);
        let code = "fn main() {\n    let x = \"hi\";\n\n}";
        let lines = engine.highlight("Rust", code).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(line_text(&lines[0]), "fn main() {");
        assert_eq!(line_text(&lines[1]), "    let x = \"hi\";");
        assert!(lines[2].is_empty());
        assert!(lines[0].iter().all(|t| t.style.foreground.is_some()));
    }

    #[test]
    fn test_unknown_language_is_none() {
        let engine = SyntaxEngine::new(None);
        assert!(engine.highlight("definitely-not-a-language", "x").is_none());
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let engine = SyntaxEngine::new(Some("no such theme"));
        assert!(engine.highlight("Rust", "let a = 1;").is_some());
    }

    #[test]
    fn test_overlong_line_is_plain() {
        let engine = SyntaxEngine::new(None);
        let long = "x".repeat(MAX_LINE_LENGTH + 1);
        let lines = engine.highlight("Rust", &long).unwrap();
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[0][0].style, TokenStyle::default());
    }

    #[tokio::test]
    async fn test_tokenize_fills_cache() {
        let t = tokenizer();
        let code = "let a = 1;\nlet b = 2;";
        assert!(t.cached("Rust", code).is_none());

        let lines = t.tokenize("Rust", code).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(t.cached("Rust", code), Some(lines));
        assert!(t.cached("Python", code).is_none());
    }

    #[tokio::test]
    async fn test_tokenize_unknown_language() {
        let t = tokenizer();
        assert!(t.tokenize("nope", "x").await.is_none());
        assert!(t.cached("nope", "x").is_none());
    }
}
