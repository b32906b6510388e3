//! hv - diff viewer with expandable context

mod app;
mod color;
mod config;
mod print;
mod syntax;
mod ui;
mod views;

use anyhow::{bail, Context, Result};
use app::App;
use clap::Parser;
use config::{Config, SyntaxMode};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hunkview_core::{
    parse_hunks, parse_patch, raw_diff_to_hunks, DiffRenderer, GapAction, Highlighter, Hunk,
    TokenJob, ViewMode,
};
use ratatui::prelude::*;
use similar::TextDiff;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use syntax::{SyntaxEngine, SyntectTokenizer};

#[derive(Parser, Debug)]
#[command(name = "hv")]
#[command(author, version, about = "A diff viewer with expandable context")]
struct Args {
    /// Files to compare: old_file new_file
    #[arg(num_args = 0..=2, conflicts_with = "patch")]
    paths: Vec<PathBuf>,

    /// Unified diff to show instead of two files ("-" reads stdin)
    #[arg(short, long, value_name = "FILE")]
    patch: Option<PathBuf>,

    /// Full old version of the patched file, enables hidden context
    #[arg(short, long, value_name = "FILE", requires = "patch")]
    original: Option<PathBuf>,

    /// Which file of a multi-file patch to show
    #[arg(short, long, value_name = "PATH")]
    file: Option<String>,

    /// Context lines around changes when comparing two files
    /// (default: the whole file is one hunk)
    #[arg(short = 'U', long, value_name = "N")]
    context: Option<usize>,

    /// View mode: unified or split
    #[arg(short, long, value_enum)]
    view: Option<CliViewMode>,

    /// Disable syntax highlighting
    #[arg(long)]
    no_syntax: bool,

    /// Print the diff instead of opening the viewer
    #[arg(long)]
    print: bool,

    /// Dump the render model as JSON
    #[arg(long, conflicts_with = "print")]
    json: bool,

    /// Start with every gap fully expanded
    #[arg(long)]
    expand_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliViewMode {
    /// One column with both line numbers
    Unified,
    /// Old and new side by side
    #[value(alias = "sbs")]
    Split,
}

impl From<CliViewMode> for ViewMode {
    fn from(mode: CliViewMode) -> Self {
        match mode {
            CliViewMode::Unified => ViewMode::Unified,
            CliViewMode::Split => ViewMode::Split,
        }
    }
}

/// A diff ready to hand to the renderer
struct Input {
    hunks: Vec<Hunk>,
    original: Option<String>,
    path: Option<String>,
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read patch from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Hunks of two texts with `context` lines around each change
fn hunks_with_context(old: &str, new: &str, context: usize) -> Result<Vec<Hunk>> {
    let diff = TextDiff::from_lines(old, new);
    let patch = diff.unified_diff().context_radius(context).to_string();
    parse_hunks(&patch).context("Failed to build hunks")
}

fn load_input(args: &Args) -> Result<Input> {
    if let Some(patch_path) = &args.patch {
        let text = read_source(patch_path)?;
        let files = parse_patch(&text)
            .with_context(|| format!("Failed to parse {}", patch_path.display()))?;
        let file = match &args.file {
            Some(wanted) => files
                .into_iter()
                .find(|f| f.matches(wanted))
                .with_context(|| format!("No file {wanted} in patch"))?,
            None => match files.into_iter().next() {
                Some(file) => file,
                None => bail!("No hunks found in {}", patch_path.display()),
            },
        };
        let original = args.original.as_deref().map(read_source).transpose()?;
        let path = args
            .file
            .clone()
            .or_else(|| file.path().map(str::to_string));
        return Ok(Input {
            hunks: file.hunks,
            original,
            path,
        });
    }

    let [old_path, new_path] = args.paths.as_slice() else {
        bail!("Expected two files to compare, or --patch FILE (see --help)");
    };
    let old = read_source(old_path)?;
    let new = read_source(new_path)?;
    let hunks = match args.context {
        Some(context) => hunks_with_context(&old, &new, context)?,
        None => raw_diff_to_hunks(&old, &new),
    };
    let path = args
        .file
        .clone()
        .unwrap_or_else(|| new_path.display().to_string());
    Ok(Input {
        hunks,
        original: Some(old),
        path: Some(path),
    })
}

fn build_renderer(input: Input, args: &Args, config: &Config) -> DiffRenderer {
    let mut renderer = DiffRenderer::new(input.hunks).with_options(config.render_options());
    if let Some(path) = &input.path {
        renderer = renderer.with_file_path(path.as_str());
    }
    if let Some(original) = &input.original {
        renderer = renderer.with_original(original);
    }

    let syntax_off = args.no_syntax || config.ui.syntax == SyntaxMode::Off;
    if syntax_off {
        return renderer;
    }
    let Some(path) = input.path.as_deref() else {
        return renderer;
    };
    let tokenizer = Arc::new(SyntectTokenizer::new(SyntaxEngine::new(
        config.ui.theme.syntax_theme.as_deref(),
    )));
    let highlighter = Highlighter::guess(tokenizer.clone(), tokenizer.as_ref(), path);
    log::debug!("language for {path}: {:?}", highlighter.as_ref().map(Highlighter::language));
    renderer.with_highlighter(highlighter)
}

/// Run jobs to completion and apply them, for the one-shot outputs
async fn settle(renderer: &mut DiffRenderer, jobs: Vec<TokenJob>) {
    for job in jobs {
        let batch = job.run().await;
        renderer.commit(batch);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::load();

    let input = load_input(&args)?;
    let mut renderer = build_renderer(input, &args, &config);

    // CLI overrides config
    let view_mode = args
        .view
        .map(ViewMode::from)
        .or(config.ui.view_mode)
        .unwrap_or_default();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;

    let interactive = !args.print && !args.json && io::stdout().is_terminal();
    if !interactive {
        runtime.block_on(async {
            let jobs = renderer.request_highlighting();
            settle(&mut renderer, jobs).await;
            if args.expand_all {
                let jobs = renderer.expand_all();
                settle(&mut renderer, jobs).await;
            }
        });
        let model = renderer.render(view_mode);
        let mut stdout = io::stdout().lock();
        if args.json {
            serde_json::to_writer_pretty(&mut stdout, &model)?;
            writeln!(stdout)?;
        } else {
            let printer = print::Printer {
                color: io::stdout().is_terminal(),
                width: crossterm::terminal::size()
                    .map(|(w, _)| w as usize)
                    .unwrap_or(160),
            };
            printer.print(&model, &mut stdout)?;
        }
        return Ok(());
    }

    // Token jobs are spawned onto this runtime from the event loop
    let _guard = runtime.enter();
    let mut app = App::new(renderer, view_mode, config.ui.line_numbers)
        .with_theme(config.ui.theme.resolve());
    app.start_highlighting();
    if args.expand_all {
        app.expand_all();
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        return Err(err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(16);

    loop {
        app.poll_token_batches();
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(tick_rate)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code != KeyCode::Char('?') {
            app.status = None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if app.show_help {
                    app.show_help = false;
                } else {
                    app.should_quit = true;
                }
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.should_quit = true;
            }
            KeyCode::Char('?') => app.show_help = !app.show_help,
            KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
            KeyCode::Char('g') | KeyCode::Home => app.cursor_top(),
            KeyCode::Char('G') | KeyCode::End => app.cursor_bottom(),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.page_down()
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.page_up()
            }
            KeyCode::PageDown | KeyCode::Char(' ') => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            KeyCode::Char('n') => app.next_gap(),
            KeyCode::Char('N') => app.prev_gap(),
            KeyCode::Enter => app.expand_at_cursor(GapAction::All),
            KeyCode::Char('[') => app.expand_at_cursor(GapAction::Top),
            KeyCode::Char(']') => app.expand_at_cursor(GapAction::Bottom),
            KeyCode::Char('e') => app.expand_all(),
            KeyCode::Char('v') | KeyCode::Tab => app.toggle_view(),
            _ => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
