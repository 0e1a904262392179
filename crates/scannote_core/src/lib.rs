//! Core domain logic for ScanNote.
//! This crate is the single source of truth for notebook invariants.

pub mod capture;
pub mod config;
pub mod db;
pub mod extraction;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod repo;
pub mod service;
pub mod shell;

pub use capture::{
    CameraDevice, CameraFailure, CaptureError, CaptureSession, CaptureState, FacingMode, Frame,
    StillFileCamera, StillImage, VideoStream,
};
pub use config::{ConfigError, CoreConfig};
pub use extraction::{ExtractionError, GeminiConfig, GeminiExtractor, TextExtractor};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{Book, BookId};
pub use model::clock::{Clock, ManualClock, SystemClock};
pub use model::note::{Note, NoteId};
pub use model::theme::Theme;
pub use model::validation::ValidationError;
pub use navigation::{EditorSession, EditorTarget, ExtractionTicket, NavigationError, View};
pub use repo::kv_repo::{KeyValueRepository, RepoError, RepoResult, SqliteKeyValueRepository};
pub use repo::notebook_repo::NotebookRepository;
pub use service::notebook_service::{BookDeletion, NoteDraft, NotebookService, ServiceError};
pub use shell::app_shell::{
    AppShell, DeletionRequest, ExtractionJob, ExtractionOutcome, ShellError,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Opens the notebook stored at `path`, applying migrations first.
pub fn open_notebook(
    path: impl AsRef<std::path::Path>,
    system_prefers_dark: bool,
) -> Result<NotebookService<SqliteKeyValueRepository>, ServiceError> {
    let conn = db::open_db(path).map_err(RepoError::from)?;
    let kv = SqliteKeyValueRepository::try_new(conn)?;
    NotebookService::load(NotebookRepository::new(kv), system_prefers_dark)
}

#[cfg(test)]
mod tests {
    use super::{core_version, open_notebook, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn open_notebook_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = open_notebook(dir.path().join("notes.sqlite3"), false).unwrap();
        assert_eq!(notebook.book_count(), 0);
        assert_eq!(notebook.note_count(), 0);
    }
}
