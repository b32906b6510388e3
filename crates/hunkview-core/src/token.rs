//! Syntax tokens and the tokenization service boundary
//!
//! Tokenization is the only asynchronous piece of the engine. The engine
//! hands out [`TokenJob`]s that carry everything they need; whoever drives
//! them (a tokio task, a test, a UI event loop) awaits [`TokenJob::run`] and
//! feeds the resulting [`TokenBatch`] back for a staleness-checked commit.

use crate::fuse::Side;
use crate::gap::GapKey;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Style attached to a token by the highlighter.
///
/// The engine only moves styles around; it never interprets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TokenStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Rgb>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
}

impl TokenStyle {
    pub fn fg(r: u8, g: u8, b: u8) -> Self {
        Self {
            foreground: Some(Rgb(r, g, b)),
            ..Self::default()
        }
    }
}

/// A styled span of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub content: String,
    pub style: TokenStyle,
}

impl Token {
    pub fn new(content: impl Into<String>, style: TokenStyle) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }
}

/// Tokens for one line
pub type TokenLine = Vec<Token>;

/// Token streams for one side of a diff, or the lack of them.
///
/// `Plain` is a complete rendering state, not an error: an unknown language,
/// a diff over the highlight ceiling and a tokenizer that never answered all
/// end up here.
#[derive(Debug, Clone, Copy, Default)]
pub enum Tokens<'a> {
    #[default]
    Plain,
    /// One entry per line of the side, in document order
    Styled(&'a [TokenLine]),
}

impl<'a> Tokens<'a> {
    pub fn from_option(lines: Option<&'a [TokenLine]>) -> Self {
        match lines {
            Some(lines) => Tokens::Styled(lines),
            None => Tokens::Plain,
        }
    }

    /// Tokens of line `index`, if the stream reaches that far
    pub fn line(&self, index: usize) -> Option<&'a [Token]> {
        match self {
            Tokens::Plain => None,
            Tokens::Styled(lines) => lines.get(index).map(Vec::as_slice),
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Tokens::Plain)
    }
}

/// Syntax tokenization service
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Synchronous cache probe; `None` means a request is needed
    fn cached(&self, language: &str, code: &str) -> Option<Vec<TokenLine>>;

    /// Tokenize `code`, one token line per line of input.
    ///
    /// `None` when the language is unsupported or the work was abandoned.
    async fn tokenize(&self, language: &str, code: &str) -> Option<Vec<TokenLine>>;
}

/// Maps a file path to a language id understood by the tokenizer
pub trait LanguageGuesser {
    fn guess_language(&self, path: &str) -> Option<String>;
}

impl<F> LanguageGuesser for F
where
    F: Fn(&str) -> Option<String>,
{
    fn guess_language(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// A tokenizer bound to the language of one file
#[derive(Clone)]
pub struct Highlighter {
    tokenizer: Arc<dyn Tokenizer>,
    language: String,
}

impl fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Highlighter")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl Highlighter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, language: impl Into<String>) -> Self {
        Self {
            tokenizer,
            language: language.into(),
        }
    }

    /// Bind `tokenizer` to whatever language `guesser` picks for `path`.
    ///
    /// `None` when the language is unknown, which means plain rendering.
    pub fn guess<G>(tokenizer: Arc<dyn Tokenizer>, guesser: &G, path: &str) -> Option<Self>
    where
        G: LanguageGuesser + ?Sized,
    {
        let language = guesser.guess_language(path)?;
        Some(Self::new(tokenizer, language))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub(crate) fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Probe the cache for every run; misses become a job
    pub(crate) fn dispatch(
        &self,
        stamp: JobStamp,
        target: TokenTarget,
        runs: Vec<CodeRun>,
    ) -> (Vec<(usize, Vec<TokenLine>)>, Option<TokenJob>) {
        let (hits, misses) = probe_runs(self.tokenizer(), &self.language, runs);
        if misses.is_empty() {
            return (hits, None);
        }
        let job = TokenJob {
            stamp,
            target,
            language: self.language.clone(),
            runs: misses,
            tokenizer: Arc::clone(&self.tokenizer),
        };
        (hits, Some(job))
    }
}

/// What a token job was dispatched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenTarget {
    /// Whole-diff stream of one side
    Diff(Side),
    /// Newly revealed lines of one gap
    Gap(GapKey),
}

/// A contiguous block of lines to tokenize.
///
/// `start` is the index of the first line in the target's own line space
/// (side cursor for diff targets, gap line index for gap targets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRun {
    pub start: usize,
    pub code: String,
}

impl CodeRun {
    pub fn from_lines<S: AsRef<str>>(start: usize, lines: &[S]) -> Self {
        let code = lines
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<&str>>()
            .join("\n");
        Self { start, code }
    }
}

/// Identity captured when a job is dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobStamp {
    pub(crate) epoch: u64,
    pub(crate) generation: u64,
    pub(crate) file_path: Option<String>,
}

/// A pending tokenization request
pub struct TokenJob {
    pub(crate) stamp: JobStamp,
    pub(crate) target: TokenTarget,
    pub(crate) language: String,
    pub(crate) runs: Vec<CodeRun>,
    pub(crate) tokenizer: Arc<dyn Tokenizer>,
}

impl fmt::Debug for TokenJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenJob")
            .field("target", &self.target)
            .field("generation", &self.stamp.generation)
            .field("language", &self.language)
            .field("runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl TokenJob {
    pub fn target(&self) -> TokenTarget {
        self.target
    }

    pub fn runs(&self) -> &[CodeRun] {
        &self.runs
    }

    /// Await the tokenizer for every run.
    ///
    /// Runs the tokenizer could not serve are left out of the batch; their
    /// lines stay plain.
    pub async fn run(self) -> TokenBatch {
        let mut results = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            match self.tokenizer.tokenize(&self.language, &run.code).await {
                Some(lines) => results.push((run.start, lines)),
                None => log::debug!(
                    "tokenizer returned nothing for {:?} ({}) at line {}",
                    self.target,
                    self.language,
                    run.start
                ),
            }
        }
        TokenBatch {
            stamp: self.stamp,
            target: self.target,
            results,
        }
    }
}

/// Results of a finished [`TokenJob`], waiting to be committed
#[derive(Debug, Clone)]
pub struct TokenBatch {
    pub(crate) stamp: JobStamp,
    pub(crate) target: TokenTarget,
    pub(crate) results: Vec<(usize, Vec<TokenLine>)>,
}

impl TokenBatch {
    pub fn target(&self) -> TokenTarget {
        self.target
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Split runs into synchronous cache hits and misses
pub(crate) fn probe_runs(
    tokenizer: &dyn Tokenizer,
    language: &str,
    runs: Vec<CodeRun>,
) -> (Vec<(usize, Vec<TokenLine>)>, Vec<CodeRun>) {
    let mut hits = Vec::new();
    let mut misses = Vec::new();
    for run in runs {
        match tokenizer.cached(language, &run.code) {
            Some(lines) => {
                log::trace!("token cache hit at line {} ({language})", run.start);
                hits.push((run.start, lines));
            }
            None => misses.push(run),
        }
    }
    (hits, misses)
}


#[cfg(test)]
mod tests {
    use super::testing::WordTokenizer;
    use super::*;

    #[test]
    fn test_tokens_line_lookup() {
        let lines = vec![vec![Token::new("a", TokenStyle::default())]];
        let styled = Tokens::Styled(&lines);
        assert_eq!(styled.line(0).map(|l| l.len()), Some(1));
        assert!(styled.line(1).is_none());
        assert!(Tokens::Plain.line(0).is_none());
        assert!(Tokens::from_option(None).is_plain());
    }

    #[test]
    fn test_code_run_joins_lines() {
        let run = CodeRun::from_lines(3, &["a", "  b", ""]);
        assert_eq!(run.start, 3);
        assert_eq!(run.code, "a\n  b\n");
    }

    #[test]
    fn test_probe_runs_splits_hits_and_misses() {
        let tokenizer = WordTokenizer::default();
        tokenizer.warm("hot");
        let runs = vec![
            CodeRun {
                start: 0,
                code: "hot".into(),
            },
            CodeRun {
                start: 5,
                code: "cold".into(),
            },
        ];
        let (hits, misses) = probe_runs(&tokenizer, "rust", runs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].start, 5);
        assert!(tokenizer.requests().is_empty());
    }

    #[tokio::test]
    async fn test_job_run_skips_unsupported() {
        let tokenizer = Arc::new(WordTokenizer {
            unsupported: true,
            ..WordTokenizer::default()
        });
        let job = TokenJob {
            stamp: JobStamp {
                epoch: 0,
                generation: 1,
                file_path: None,
            },
            target: TokenTarget::Diff(Side::Old),
            language: "brainfuck".into(),
            runs: vec![CodeRun {
                start: 0,
                code: "+++".into(),
            }],
            tokenizer,
        };
        let batch = job.run().await;
        assert!(batch.is_empty());
        assert_eq!(batch.target(), TokenTarget::Diff(Side::Old));
    }

    #[test]
    fn test_highlighter_dispatch_only_jobs_misses() {
        let tokenizer = Arc::new(WordTokenizer::default());
        tokenizer.warm("fn a()");
        let highlighter = Highlighter::new(tokenizer.clone(), "rust");
        let stamp = JobStamp {
            epoch: 3,
            generation: 7,
            file_path: Some("a.rs".into()),
        };
        let runs = vec![
            CodeRun::from_lines(0, &["fn a()"]),
            CodeRun::from_lines(4, &["fn b()"]),
        ];
        let (hits, job) = highlighter.dispatch(stamp.clone(), TokenTarget::Diff(Side::New), runs);
        assert_eq!(hits.len(), 1);
        let job = job.expect("one miss");
        assert_eq!(job.runs().len(), 1);
        assert_eq!(job.runs()[0].start, 4);
        assert_eq!(job.stamp, stamp);

        let all_cached = vec![CodeRun::from_lines(0, &["fn a()"])];
        let (_, job) = highlighter.dispatch(stamp, TokenTarget::Diff(Side::Old), all_cached);
        assert!(job.is_none());
    }

    #[test]
    fn test_highlighter_guess() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(WordTokenizer::default());
        let guess = |path: &str| path.ends_with(".rs").then(|| "Rust".to_string());
        let found = Highlighter::guess(tokenizer.clone(), &guess, "lib.rs").expect("rust");
        assert_eq!(found.language(), "Rust");
        assert!(Highlighter::guess(tokenizer, &guess, "README").is_none());
    }

    #[test]
    fn test_closure_language_guesser() {
        let guess = |path: &str| path.ends_with(".rs").then(|| "Rust".to_string());
        assert_eq!(guess.guess_language("src/main.rs").as_deref(), Some("Rust"));
        assert_eq!(guess.guess_language("notes.txt"), None);
    }
}
