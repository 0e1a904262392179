//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose notebook use-cases to Dart via FRB.
//! - Flatten core errors into envelopes carrying the user-facing alert text.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One notebook is open per process; `notebook_open` replaces it.
//! - IDs cross the boundary as UUID strings.
//! - Deletes are two-step: a request returns a prompt and token, and only
//!   `deletion_confirm` with the latest token removes anything.

use log::warn;
use scannote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_notebook,
    ping as ping_inner, Book, CoreConfig, DeletionRequest, GeminiExtractor, Note, NoteDraft,
    NotebookService, SqliteKeyValueRepository, StillImage, TextExtractor,
};
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

type Notebook = NotebookService<SqliteKeyValueRepository>;

/// Open notebook plus the deletion awaiting confirmation, if any.
struct Session {
    notebook: Notebook,
    pending: Option<(u64, DeletionRequest)>,
    next_token: u64,
}

static SESSION: OnceLock<Mutex<Option<Session>>> = OnceLock::new();

const NOT_OPEN_MESSAGE: &str = "Notebook is not open.";
const NO_PENDING_MESSAGE: &str = "No deletion is waiting for confirmation.";

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Book row for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookItem {
    pub book_id: String,
    pub title: String,
    pub created_at_ms: i64,
    /// Notes currently filed in this book.
    pub note_count: u32,
}

/// Note row for list and editor screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub note_id: String,
    pub book_id: String,
    pub content: String,
    /// First line preview, at most 100 characters plus `...`.
    pub snippet: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooksResponse {
    pub ok: bool,
    /// Newest first.
    pub items: Vec<BookItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesResponse {
    pub ok: bool,
    /// Most recently updated first.
    pub items: Vec<NoteItem>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// ID of the created or updated entity, when there is one.
    pub id: Option<String>,
    /// Alert text on failure; short confirmation on success.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Confirmation step of a two-step delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPromptResponse {
    pub ok: bool,
    /// Pass to `deletion_confirm`; `0` on failure.
    pub token: u64,
    /// Question to show before confirming.
    pub prompt: String,
    /// Notes removed along with a book; `0` for a note delete.
    pub note_count: u32,
    pub message: String,
}

impl DeletionPromptResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            token: 0,
            prompt: String::new(),
            note_count: 0,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeResponse {
    pub ok: bool,
    /// `light` or `dark`.
    pub theme: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResponse {
    pub ok: bool,
    /// Extracted text; empty on failure or when the image has no text.
    pub text: String,
    pub message: String,
}

/// Opens (or reopens) the notebook database at `db_path`.
///
/// # FFI contract
/// - Sync call; runs migrations on first open.
/// - Replaces any previously open notebook and drops its pending deletion.
#[flutter_rust_bridge::frb(sync)]
pub fn notebook_open(db_path: String, system_prefers_dark: bool) -> ActionResponse {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return ActionResponse::failure("notebook_open failed: db_path cannot be empty");
    }
    match open_notebook(trimmed, system_prefers_dark) {
        Ok(notebook) => {
            let mut slot = lock_slot();
            *slot = Some(Session {
                notebook,
                pending: None,
                next_token: 1,
            });
            ActionResponse::success("Notebook opened.", None)
        }
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error call=notebook_open error={err}");
            ActionResponse::failure(err.user_message())
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn books_list() -> BooksResponse {
    let result = with_notebook(|notebook| {
        Ok(notebook
            .books()
            .into_iter()
            .map(|book| to_book_item(notebook, book))
            .collect::<Vec<_>>())
    });
    match result {
        Ok(items) => BooksResponse {
            ok: true,
            items,
            message: String::new(),
        },
        Err(message) => BooksResponse {
            ok: false,
            items: Vec::new(),
            message,
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn book_create(title: String) -> ActionResponse {
    match with_notebook_mut(|notebook| {
        notebook
            .create_book(&title)
            .map_err(|err| err.user_message())
    }) {
        Ok(book) => ActionResponse::success("Book created.", Some(book.id.to_string())),
        Err(message) => ActionResponse::failure(message),
    }
}

/// First step of deleting a book and every note in it.
///
/// Nothing is removed until `deletion_confirm` is called with the returned
/// token. A newer request replaces this one.
#[flutter_rust_bridge::frb(sync)]
pub fn book_delete_request(book_id: String) -> DeletionPromptResponse {
    match parse_id(&book_id, "book_id") {
        Ok(book_id) => request_deletion(|notebook| {
            notebook
                .book(book_id)
                .map(|_| DeletionRequest::Book {
                    book_id,
                    note_count: notebook.notes_in_book(book_id).len(),
                })
                .ok_or_else(|| format!("no book with id {book_id}"))
        }),
        Err(message) => DeletionPromptResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn notes_list(book_id: String) -> NotesResponse {
    let result = parse_id(&book_id, "book_id").and_then(|book_id| {
        with_notebook(|notebook| {
            Ok(notebook
                .notes_in_book(book_id)
                .into_iter()
                .map(to_note_item)
                .collect::<Vec<_>>())
        })
    });
    match result {
        Ok(items) => NotesResponse {
            ok: true,
            items,
            message: String::new(),
        },
        Err(message) => NotesResponse {
            ok: false,
            items: Vec::new(),
            message,
        },
    }
}

/// Creates a note (`note_id = None`) or updates an existing one.
///
/// `book_id = None` means no book was picked; the save is rejected with the
/// "select or create a book" alert.
#[flutter_rust_bridge::frb(sync)]
pub fn note_save(
    note_id: Option<String>,
    book_id: Option<String>,
    content: String,
) -> ActionResponse {
    let existing = match parse_optional_id(note_id.as_deref(), "note_id") {
        Ok(id) => id,
        Err(message) => return ActionResponse::failure(message),
    };
    let book_id = match parse_optional_id(book_id.as_deref(), "book_id") {
        Ok(id) => id,
        Err(message) => return ActionResponse::failure(message),
    };

    let draft = NoteDraft {
        existing,
        book_id,
        content,
    };
    match with_notebook_mut(|notebook| {
        notebook
            .save_note(draft)
            .map_err(|err| err.user_message())
    }) {
        Ok(note) => ActionResponse::success("Note saved.", Some(note.id.to_string())),
        Err(message) => ActionResponse::failure(message),
    }
}

/// First step of deleting one note; see `book_delete_request`.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete_request(note_id: String) -> DeletionPromptResponse {
    match parse_id(&note_id, "note_id") {
        Ok(note_id) => request_deletion(|notebook| {
            notebook
                .note(note_id)
                .map(|_| DeletionRequest::Note { note_id })
                .ok_or_else(|| format!("no note with id {note_id}"))
        }),
        Err(message) => DeletionPromptResponse::failure(message),
    }
}

/// Applies the pending deletion if `token` is the latest one handed out.
///
/// The pending request is consumed whether or not the delete succeeds.
#[flutter_rust_bridge::frb(sync)]
pub fn deletion_confirm(token: u64) -> ActionResponse {
    let mut slot = lock_slot();
    let Some(session) = slot.as_mut() else {
        return ActionResponse::failure(NOT_OPEN_MESSAGE);
    };
    let request = match session.pending.take() {
        Some((pending, request)) if pending == token => request,
        other => {
            session.pending = other;
            warn!("event=ffi_call module=ffi status=error call=deletion_confirm token={token}");
            return ActionResponse::failure(NO_PENDING_MESSAGE);
        }
    };

    let result = match request {
        DeletionRequest::Book { book_id, .. } => {
            session.notebook.delete_book(book_id).map(|deletion| {
                (
                    format!("Book deleted with {} note(s).", deletion.removed_notes),
                    deletion.book.id.to_string(),
                )
            })
        }
        DeletionRequest::Note { note_id } => session
            .notebook
            .delete_note(note_id)
            .map(|note| ("Note deleted.".to_string(), note.id.to_string())),
    };
    match result {
        Ok((message, id)) => ActionResponse::success(message, Some(id)),
        Err(err) => ActionResponse::failure(err.user_message()),
    }
}

/// Drops the pending deletion, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn deletion_cancel() -> ActionResponse {
    match with_session_mut(|session| Ok(session.pending.take())) {
        Ok(_) => ActionResponse::success("Deletion cancelled.", None),
        Err(message) => ActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn theme_get() -> ThemeResponse {
    to_theme_response(with_notebook(|notebook| Ok(notebook.theme())))
}

#[flutter_rust_bridge::frb(sync)]
pub fn theme_toggle() -> ThemeResponse {
    to_theme_response(with_notebook_mut(|notebook| {
        notebook.toggle_theme().map_err(|err| err.user_message())
    }))
}

/// Extracts text from a PNG still captured by the host camera.
///
/// # FFI contract
/// - Blocking network call; runs on the FRB worker pool, not the UI thread.
/// - API key and model come from the process environment.
/// - Every failure carries the same generic alert text.
pub fn extract_text_png(png_bytes: Vec<u8>) -> ExtractionResponse {
    let image = match StillImage::from_png(png_bytes) {
        Ok(image) => image,
        Err(err) => {
            return ExtractionResponse {
                ok: false,
                text: String::new(),
                message: err.user_message().to_string(),
            }
        }
    };

    let result = CoreConfig::from_env()
        .map_err(|err| scannote_core::ExtractionError::communication(err.to_string()))
        .and_then(|config| GeminiExtractor::new(config.gemini))
        .and_then(|extractor| extractor.extract(&image));
    match result {
        Ok(text) => ExtractionResponse {
            ok: true,
            text,
            message: String::new(),
        },
        Err(err) => ExtractionResponse {
            ok: false,
            text: String::new(),
            message: err.user_message().to_string(),
        },
    }
}

fn lock_slot() -> std::sync::MutexGuard<'static, Option<Session>> {
    SESSION
        .get_or_init(|| Mutex::new(None))
        .lock()
        // Memory is only updated after a successful save, so a poisoned
        // slot still holds a consistent notebook.
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_session_mut<T>(f: impl FnOnce(&mut Session) -> Result<T, String>) -> Result<T, String> {
    let mut slot = lock_slot();
    let session = slot.as_mut().ok_or_else(|| NOT_OPEN_MESSAGE.to_string())?;
    f(session)
}

fn with_notebook<T>(f: impl FnOnce(&Notebook) -> Result<T, String>) -> Result<T, String> {
    with_session_mut(|session| f(&session.notebook))
}

fn with_notebook_mut<T>(f: impl FnOnce(&mut Notebook) -> Result<T, String>) -> Result<T, String> {
    with_session_mut(|session| f(&mut session.notebook))
}

/// Stores the request built by `build` as the pending deletion.
fn request_deletion(
    build: impl FnOnce(&Notebook) -> Result<DeletionRequest, String>,
) -> DeletionPromptResponse {
    let result = with_session_mut(|session| {
        let request = build(&session.notebook)?;
        let token = session.next_token;
        session.next_token += 1;
        session.pending = Some((token, request.clone()));
        Ok((token, request))
    });
    match result {
        Ok((token, request)) => DeletionPromptResponse {
            ok: true,
            token,
            prompt: request.prompt().to_string(),
            note_count: match request {
                DeletionRequest::Book { note_count, .. } => {
                    u32::try_from(note_count).unwrap_or(u32::MAX)
                }
                DeletionRequest::Note { .. } => 0,
            },
            message: String::new(),
        },
        Err(message) => DeletionPromptResponse::failure(message),
    }
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid {field}: `{raw}`"))
}

fn parse_optional_id(raw: Option<&str>, field: &str) -> Result<Option<Uuid>, String> {
    raw.map(|id| parse_id(id, field)).transpose()
}

fn to_book_item(notebook: &Notebook, book: &Book) -> BookItem {
    BookItem {
        book_id: book.id.to_string(),
        title: book.title.clone(),
        created_at_ms: book.created_at,
        note_count: u32::try_from(notebook.notes_in_book(book.id).len()).unwrap_or(u32::MAX),
    }
}

fn to_note_item(note: &Note) -> NoteItem {
    NoteItem {
        note_id: note.id.to_string(),
        book_id: note.book_id.to_string(),
        content: note.content.clone(),
        snippet: note.snippet(),
        created_at_ms: note.created_at,
        updated_at_ms: note.updated_at,
    }
}

fn to_theme_response(result: Result<scannote_core::Theme, String>) -> ThemeResponse {
    match result {
        Ok(theme) => ThemeResponse {
            ok: true,
            theme: theme.as_str().to_string(),
            message: String::new(),
        },
        Err(message) => ThemeResponse {
            ok: false,
            theme: String::new(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        book_create, book_delete_request, books_list, core_version, deletion_cancel,
        deletion_confirm, extract_text_png, init_logging, note_delete_request, note_save,
        notebook_open, notes_list, ping, theme_get, theme_toggle,
    };
    use std::sync::Mutex;

    // The notebook slot is process-global; tests touching it run one at a time.
    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn notebook_flow_round_trips_through_envelopes() {
        let _serial = SERIAL.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ffi.sqlite3");
        let opened = notebook_open(db_path.to_str().unwrap().to_string(), false);
        assert!(opened.ok, "{}", opened.message);

        let created = book_create("Groceries".to_string());
        assert!(created.ok, "{}", created.message);
        let book_id = created.id.clone().unwrap();

        let saved = note_save(None, Some(book_id.clone()), "milk\neggs".to_string());
        assert!(saved.ok, "{}", saved.message);

        let books = books_list();
        assert_eq!(books.items.len(), 1);
        assert_eq!(books.items[0].note_count, 1);

        let notes = notes_list(book_id.clone());
        assert_eq!(notes.items.len(), 1);
        assert_eq!(notes.items[0].snippet, "milk");
        assert_eq!(notes.items[0].created_at_ms, notes.items[0].updated_at_ms);

        let request = book_delete_request(book_id.clone());
        assert!(request.ok, "{}", request.message);
        assert_eq!(request.note_count, 1);
        assert_eq!(
            request.prompt,
            "Are you sure you want to delete this book and all its notes?"
        );
        let deleted = deletion_confirm(request.token);
        assert!(deleted.ok, "{}", deleted.message);
        assert!(notes_list(book_id).items.is_empty());
        assert!(books_list().items.is_empty());
    }

    #[test]
    fn deletion_needs_the_latest_token() {
        let _serial = SERIAL.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("confirm.sqlite3");
        assert!(notebook_open(db_path.to_str().unwrap().to_string(), false).ok);

        let book_id = book_create("Trip".to_string()).id.unwrap();
        let first = note_save(None, Some(book_id.clone()), "tickets".to_string())
            .id
            .unwrap();
        let second = note_save(None, Some(book_id.clone()), "hotel".to_string())
            .id
            .unwrap();

        // Nothing is pending yet.
        assert!(!deletion_confirm(1).ok);

        let stale = note_delete_request(first.clone());
        assert!(stale.ok, "{}", stale.message);
        assert_eq!(stale.prompt, "Are you sure you want to delete this note?");
        assert_eq!(stale.note_count, 0);
        let latest = note_delete_request(second.clone());
        assert_ne!(stale.token, latest.token);

        let refused = deletion_confirm(stale.token);
        assert!(!refused.ok);
        assert_eq!(notes_list(book_id.clone()).items.len(), 2);

        let applied = deletion_confirm(latest.token);
        assert!(applied.ok, "{}", applied.message);
        assert_eq!(applied.id.as_deref(), Some(second.as_str()));
        let remaining = notes_list(book_id.clone()).items;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].note_id, first);

        // A confirmed token cannot be replayed.
        assert!(!deletion_confirm(latest.token).ok);

        let cancelled = book_delete_request(book_id.clone());
        assert!(deletion_cancel().ok);
        assert!(!deletion_confirm(cancelled.token).ok);
        assert_eq!(books_list().items.len(), 1);
    }

    #[test]
    fn reopening_drops_the_pending_deletion() {
        let _serial = SERIAL.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("reopen.sqlite3").to_str().unwrap().to_string();
        assert!(notebook_open(db_path.clone(), false).ok);

        let book_id = book_create("Keep".to_string()).id.unwrap();
        let request = book_delete_request(book_id);
        assert!(request.ok, "{}", request.message);

        assert!(notebook_open(db_path, false).ok);
        assert!(!deletion_confirm(request.token).ok);
        assert_eq!(books_list().items.len(), 1);
    }

    #[test]
    fn validation_failures_carry_alert_text() {
        let _serial = SERIAL.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("alerts.sqlite3");
        assert!(notebook_open(db_path.to_str().unwrap().to_string(), false).ok);

        let response = note_save(None, None, "text".to_string());
        assert!(!response.ok);
        assert_eq!(
            response.message,
            "Please select or create a book to save the note."
        );

        let book_id = book_create("B".to_string()).id.unwrap();
        let response = note_save(None, Some(book_id), "   ".to_string());
        assert_eq!(response.message, "Note content cannot be empty.");

        let response = book_create(" ".to_string());
        assert_eq!(response.message, "Book title cannot be empty.");

        let response = book_delete_request("not-a-uuid".to_string());
        assert!(!response.ok);
        assert_eq!(response.token, 0);
    }

    #[test]
    fn theme_follows_system_then_toggles() {
        let _serial = SERIAL.lock().unwrap_or_else(|p| p.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("theme.sqlite3");
        assert!(notebook_open(db_path.to_str().unwrap().to_string(), true).ok);

        assert_eq!(theme_get().theme, "dark");
        assert_eq!(theme_toggle().theme, "light");
        assert_eq!(theme_get().theme, "light");
    }

    #[test]
    fn extract_rejects_non_png_bytes() {
        let response = extract_text_png(b"definitely not a png".to_vec());
        assert!(!response.ok);
        assert!(response.text.is_empty());
        assert!(!response.message.is_empty());
    }
}
