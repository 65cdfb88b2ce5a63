//! acctkeep - keep track of email and website accounts
//!
//! Terminal UI built with Ratatui and crossterm, plus a few
//! non-interactive subcommands.

mod app;
mod clipboard;
mod commands;
mod config;
mod form;
mod handlers;
mod prompt;
mod ui;

use acctkeep_core::{
    Conflict, ConflictDecision, ConflictResolver, EntryService, ImportSummary, Importer,
    RecordStore,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use app::App;
use config::{Config, ConflictMode};
use prompt::Resolver;

/// acctkeep - a local store for email and website credentials
#[derive(Parser, Debug)]
#[command(name = "acctkeep")]
#[command(about = "Keep track of email and website accounts")]
struct Args {
    /// Path to a config file (defaults to the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the record store, overriding the config
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print entries, optionally filtered by a search query
    List {
        #[arg(default_value = "")]
        query: String,
    },
    /// Export every entry as a JSON array
    Export {
        /// Output file or directory (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import entries from a JSON array
    Import {
        file: PathBuf,
        /// How to handle duplicates (defaults to the configured policy)
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictMode>,
        /// Only check duplicates against entries stored before the import
        #[arg(long)]
        snapshot: bool,
        /// Stop at the first invalid entry
        #[arg(long)]
        abort_on_error: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config)?;
    let store_path = args.store.unwrap_or_else(|| config.store_path.clone());

    init_logging(&store_path, args.command.is_none())?;
    if let Some(source) = config.source() {
        tracing::info!("Loaded config from {}: {:?}", source.display(), config);
    }
    tracing::info!("Starting acctkeep with store: {}", store_path.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let store = runtime.block_on(RecordStore::open(store_path))?;
    let entries = EntryService::default();

    match args.command {
        Some(command) => {
            let result = runtime.block_on(run_command(command, &store, &entries, &config));
            runtime.block_on(store.close())?;
            result
        }
        None => run_tui(runtime, store, entries, config),
    }
}

/// Log to stderr for subcommands, to a file next to the store in use while
/// the TUI owns the terminal.
fn init_logging(store_path: &Path, tui: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("acctkeep=info".parse()?)
        .add_directive("acctkeep_core=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if tui {
        let log_dir = config::log_dir(store_path);
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
        let log_path = log_dir.join("acctkeep.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

async fn run_command(
    command: Command,
    store: &RecordStore,
    entries: &EntryService,
    config: &Config,
) -> Result<()> {
    match command {
        Command::List { query } => commands::list(store, &query, &mut io::stdout().lock()).await,
        Command::Export { output } => commands::export(store, config, output).await,
        Command::Import {
            file,
            on_conflict,
            snapshot,
            abort_on_error,
        } => {
            let flags = commands::ImportFlags {
                on_conflict,
                snapshot,
                abort_on_error,
            };
            commands::import(store, entries, config, &file, flags).await
        }
    }
}

fn run_tui(runtime: Runtime, store: RecordStore, entries: EntryService, config: Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(runtime, store, entries, config);

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!("UI loop failed: {:#}", e);
        eprintln!("Error: {e}");
    }

    app.shutdown()
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app))?;

        // Poll for events with timeout so the status line can expire
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handlers::handle_key(app, key) {
                    break;
                }
            }
        }

        if let Some(path) = app.take_pending_import() {
            let result = run_import(terminal, app, &path);
            app.finish_import(result);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Import a file from inside the UI, asking about duplicates in a dialog.
fn run_import<B: Backend>(terminal: &mut Terminal<B>, app: &App, path: &Path) -> Result<ImportSummary> {
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut resolver = Resolver::from_mode(app.config.conflict_policy, move || TerminalPrompt {
        terminal,
        app,
    });
    let importer = Importer::new(&app.store, &app.entries).with_options(app.config.import_options());
    let summary = app.block_on(importer.import_json(&payload, &mut resolver))?;
    Ok(summary)
}

/// Replace/skip dialog drawn over the main view.
struct TerminalPrompt<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    app: &'a App,
}

impl<B: Backend> TerminalPrompt<'_, B> {
    fn ask(&mut self, message: &str) -> Result<ConflictDecision> {
        let app = self.app;
        loop {
            self.terminal
                .draw(|frame| ui::render_conflict(frame, app, message))?;
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                        return Ok(ConflictDecision::Replace)
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        return Ok(ConflictDecision::Skip)
                    }
                    _ => {}
                }
            }
        }
    }
}

impl<B: Backend> ConflictResolver for TerminalPrompt<'_, B> {
    async fn resolve(&mut self, conflict: &Conflict<'_>) -> ConflictDecision {
        match self.ask(&conflict.message()) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("Conflict dialog failed, keeping stored record: {:#}", e);
                ConflictDecision::Skip
            }
        }
    }
}
