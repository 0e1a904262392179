//! `scannote` command-line driver.
//!
//! # Responsibility
//! - Run notebook use-cases against the configured database.
//! - Drive the scan flow from an image file instead of a live camera.

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use scannote_core::{
    core_version, init_logging, open_notebook, ping, AppShell, BookId, ConfigError, CoreConfig,
    DeletionRequest, EditorSession, EditorTarget, ExtractionOutcome, GeminiExtractor,
    NotebookService, ShellError, SqliteKeyValueRepository, StillFileCamera, View,
};
use std::error::Error;
use std::path::{Path, PathBuf};

type Notebook = NotebookService<SqliteKeyValueRepository>;

#[derive(Parser)]
#[command(name = "scannote")]
#[command(about = "Notebooks with camera text extraction")]
#[command(version = core_version())]
struct Cli {
    /// Database file; overrides SCANNOTE_DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the core library is linked
    Ping,
    /// List books, newest first
    Books,
    /// Create a book
    AddBook { title: String },
    /// Delete a book and all its notes
    DeleteBook {
        book_id: BookId,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List the notes of a book, most recently updated first
    Notes { book_id: BookId },
    /// Extract text from an image and save it as a note
    Scan {
        #[arg(long = "book")]
        book_id: BookId,
        image: PathBuf,
    },
    /// Show the theme, or toggle it
    Theme { action: Option<ThemeAction> },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeAction {
    Toggle,
}

fn main() -> Result<(), Box<dyn Error>> {
    run(Cli::parse(), || {
        dotenvy::dotenv().ok();
        CoreConfig::from_env()
    })
}

/// `load_config` is only called for commands that touch the notebook.
fn run(
    cli: Cli,
    load_config: impl FnOnce() -> Result<CoreConfig, ConfigError>,
) -> Result<(), Box<dyn Error>> {
    // Linkage check only; must work without any environment.
    if let Command::Ping = cli.command {
        println!("scannote_core ping={}", ping());
        println!("scannote_core version={}", core_version());
        return Ok(());
    }

    let mut config = load_config()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, &log_dir.to_string_lossy())?;
    }

    let mut notebook = open_notebook(&config.db_path, false).map_err(|err| alert(err.into()))?;
    info!(
        "event=cli_start module=cli status=ok books={} notes={}",
        notebook.book_count(),
        notebook.note_count()
    );

    match cli.command {
        Command::Ping => {}
        Command::Books => print_books(&notebook),
        Command::AddBook { title } => {
            let book = notebook
                .create_book(&title)
                .map_err(|err| alert(err.into()))?;
            println!("{}", book.id);
        }
        Command::DeleteBook { book_id, yes } => {
            let note_count = notebook.notes_in_book(book_id).len();
            let request = DeletionRequest::Book {
                book_id,
                note_count,
            };
            if !yes {
                println!("{} Re-run with --yes to confirm.", request.prompt());
                return Ok(());
            }
            let deletion = notebook
                .delete_book(book_id)
                .map_err(|err| alert(err.into()))?;
            println!(
                "deleted {} with {} note(s)",
                deletion.book.title, deletion.removed_notes
            );
        }
        Command::Notes { book_id } => {
            if notebook.book(book_id).is_none() {
                return Err(format!("no book with id {book_id}").into());
            }
            for note in notebook.notes_in_book(book_id) {
                println!("{}\t{}\t{}", note.id, note.updated_at, note.snippet());
            }
        }
        Command::Scan { book_id, image } => {
            scan_into_book(notebook, &config, book_id, &image)?;
        }
        Command::Theme { action } => {
            let theme = match action {
                Some(ThemeAction::Toggle) => notebook
                    .toggle_theme()
                    .map_err(|err| alert(err.into()))?,
                None => notebook.theme(),
            };
            println!("{}", theme.as_str());
        }
    }
    Ok(())
}

fn print_books(notebook: &Notebook) {
    for book in notebook.books() {
        println!(
            "{}\t{}\t{} note(s)",
            book.id,
            book.title,
            notebook.notes_in_book(book.id).len()
        );
    }
}

/// Runs select book → camera → scan → save through the app shell.
fn scan_into_book(
    notebook: Notebook,
    config: &CoreConfig,
    book_id: BookId,
    image: &Path,
) -> Result<(), Box<dyn Error>> {
    let extractor = GeminiExtractor::new(config.gemini.clone())?;
    let mut shell = AppShell::new(
        notebook,
        Box::new(StillFileCamera::new(image)),
        Box::new(extractor),
    );

    shell.select_book(book_id).map_err(alert)?;
    shell.open_camera().map_err(alert)?;
    if shell.scan().map_err(alert)? == ExtractionOutcome::Discarded {
        return Err("scan result was discarded".into());
    }

    let content = match shell.view() {
        View::NoteEditor(EditorSession {
            target: EditorTarget::Draft { content },
            ..
        }) => content.clone(),
        other => return Err(format!("unexpected view after scan: {}", other.name()).into()),
    };
    let note = shell.save_note(content, Some(book_id)).map_err(alert)?;
    println!("{}", note.id);
    Ok(())
}

fn alert(err: ShellError) -> Box<dyn Error> {
    err.user_message().into()
}
