//! Application shell: routes user commands to the notebook and the view.
//!
//! # Responsibility
//! - Hold the current `View`, the camera session and the extractor.
//! - Apply each command to the notebook service and move the view.
//!
//! # Invariants
//! - The view never references a book or note that no longer exists.
//! - A capture session is alive only while the view is `Camera`.
//! - At most one extraction is pending; results for any other ticket are
//!   discarded.
//! - Deletions only happen through a confirmed `DeletionRequest`.

use crate::capture::{
    CameraDevice, CameraFailure, CaptureError, CaptureSession, FacingMode, StillImage,
};
use crate::extraction::{ExtractionError, TextExtractor};
use crate::model::book::{Book, BookId};
use crate::model::note::{Note, NoteId};
use crate::model::theme::Theme;
use crate::navigation::{
    list_view_for, EditorSession, EditorTarget, ExtractionTicket, NavigationError, View,
};
use crate::repo::kv_repo::KeyValueRepository;
use crate::service::notebook_service::{NoteDraft, NotebookService, ServiceError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Shell-level error. Every variant maps to one blocking alert.
#[derive(Debug)]
pub enum ShellError {
    Navigation(NavigationError),
    Service(ServiceError),
    Capture(CaptureError),
    Extraction(ExtractionError),
    /// An extraction is still pending.
    Busy,
}

impl ShellError {
    /// Alert text for the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Navigation(_) => "This action is not available right now.".to_string(),
            Self::Service(err) => err.user_message(),
            Self::Capture(err) => err.user_message().to_string(),
            Self::Extraction(err) => err.user_message().to_string(),
            Self::Busy => "Please wait for the current scan to finish.".to_string(),
        }
    }
}

impl Display for ShellError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Capture(err) => write!(f, "{err}"),
            Self::Extraction(err) => write!(f, "{err}"),
            Self::Busy => write!(f, "extraction already in progress"),
        }
    }
}

impl Error for ShellError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Navigation(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Capture(err) => Some(err),
            Self::Extraction(err) => Some(err),
            Self::Busy => None,
        }
    }
}

impl From<NavigationError> for ShellError {
    fn from(value: NavigationError) -> Self {
        Self::Navigation(value)
    }
}

impl From<ServiceError> for ShellError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<CaptureError> for ShellError {
    fn from(value: CaptureError) -> Self {
        Self::Capture(value)
    }
}

/// Captured still waiting for text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub ticket: ExtractionTicket,
    pub image: StillImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Extracted text now fills a new, unsaved draft.
    Drafted,
    /// The view moved on before the result arrived; nothing was applied.
    Discarded,
}

/// Pending destructive action awaiting explicit confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionRequest {
    Book { book_id: BookId, note_count: usize },
    Note { note_id: NoteId },
}

impl DeletionRequest {
    /// Confirmation prompt shown before the delete is applied.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Book { .. } => "Are you sure you want to delete this book and all its notes?",
            Self::Note { .. } => "Are you sure you want to delete this note?",
        }
    }
}

/// Composition root for one notebook session.
pub struct AppShell<K: KeyValueRepository> {
    notebook: NotebookService<K>,
    view: View,
    camera: Box<dyn CameraDevice>,
    capture: Option<CaptureSession>,
    extractor: Box<dyn TextExtractor>,
    next_ticket: ExtractionTicket,
}

impl<K: KeyValueRepository> AppShell<K> {
    pub fn new(
        notebook: NotebookService<K>,
        camera: Box<dyn CameraDevice>,
        extractor: Box<dyn TextExtractor>,
    ) -> Self {
        Self {
            notebook,
            view: View::BookList,
            camera,
            capture: None,
            extractor,
            next_ticket: 1,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn notebook(&self) -> &NotebookService<K> {
        &self.notebook
    }

    pub fn theme(&self) -> Theme {
        self.notebook.theme()
    }

    /// Notes of the book the current view refers to, newest edit first.
    pub fn visible_notes(&self) -> Vec<&Note> {
        match self.view.selected_book() {
            Some(book_id) => self.notebook.notes_in_book(book_id),
            None => Vec::new(),
        }
    }

    /// Terminal camera failure to show full-screen, if any.
    pub fn camera_error(&self) -> Option<&CameraFailure> {
        self.capture.as_ref().and_then(CaptureSession::failure)
    }

    /// True while an extraction is pending. The host shows a loading state.
    pub fn is_busy(&self) -> bool {
        self.view.pending_extraction().is_some()
    }

    pub fn select_book(&mut self, book_id: BookId) -> Result<(), ShellError> {
        if self.notebook.book(book_id).is_none() {
            return Err(ServiceError::BookNotFound(book_id).into());
        }
        let next = self.view.select_book(book_id)?;
        self.set_view(next);
        Ok(())
    }

    /// Opens a note listed in the current book.
    pub fn select_note(&mut self, note_id: NoteId) -> Result<(), ShellError> {
        let owner = self
            .notebook
            .note(note_id)
            .map(|note| note.book_id)
            .ok_or(ServiceError::NoteNotFound(note_id))?;
        if let View::NoteList { book_id } = &self.view {
            if *book_id != owner {
                return Err(NavigationError::InvalidTransition {
                    from: self.view.name(),
                    action: "open a note from another book",
                }
                .into());
            }
        }
        let next = self.view.select_note(note_id)?;
        self.set_view(next);
        Ok(())
    }

    /// Opens a blank editor for a new note.
    pub fn new_note(&mut self) -> Result<(), ShellError> {
        let next = self.view.new_note()?;
        self.set_view(next);
        Ok(())
    }

    /// Moves to the camera view and acquires a stream.
    ///
    /// On failure the view stays on `Camera`; `camera_error` carries the
    /// reason until the user navigates back.
    pub fn open_camera(&mut self) -> Result<FacingMode, ShellError> {
        let next = self.view.open_camera()?;
        self.set_view(next);

        let mut session = CaptureSession::new();
        let started = session.start(&mut *self.camera);
        self.capture = Some(session);
        started.map_err(|failure| CaptureError::Camera(failure).into())
    }

    /// Takes a still and moves to the editor's loading state.
    pub fn capture(&mut self) -> Result<ExtractionJob, ShellError> {
        if self.is_busy() {
            return Err(ShellError::Busy);
        }
        let ticket = self.next_ticket;
        let next = self.view.begin_extraction(ticket)?;
        let session = self
            .capture
            .as_mut()
            .ok_or(CaptureError::NotStreaming { state: "idle" })?;
        let image = session.capture()?;

        self.next_ticket += 1;
        self.set_view(next);
        info!("event=scan_capture module=shell status=ok ticket={ticket}");
        Ok(ExtractionJob { ticket, image })
    }

    /// Applies an extraction result delivered for `ticket`.
    ///
    /// # Errors
    /// - `ShellError::Extraction` after the view has already moved back to
    ///   the list view; the error is the alert to show.
    pub fn complete_extraction(
        &mut self,
        ticket: ExtractionTicket,
        result: Result<String, ExtractionError>,
    ) -> Result<ExtractionOutcome, ShellError> {
        if self.view.pending_extraction() != Some(ticket) {
            warn!(
                "event=scan_complete module=shell status=discarded ticket={ticket} view={}",
                self.view.name()
            );
            return Ok(ExtractionOutcome::Discarded);
        }

        match result {
            Ok(text) => {
                let next = self.view.fill_extracted(text)?;
                self.set_view(next);
                info!("event=scan_complete module=shell status=ok ticket={ticket}");
                Ok(ExtractionOutcome::Drafted)
            }
            Err(err) => {
                let next = self.view.back();
                self.set_view(next);
                warn!(
                    "event=scan_complete module=shell status=error ticket={ticket} view={}",
                    self.view.name()
                );
                Err(ShellError::Extraction(err))
            }
        }
    }

    /// Capture, extract and apply in one blocking call.
    pub fn scan(&mut self) -> Result<ExtractionOutcome, ShellError> {
        let job = self.capture()?;
        let result = self.extractor.extract(&job.image);
        self.complete_extraction(job.ticket, result)
    }

    /// Context-sensitive back. Releases the camera when leaving it.
    pub fn back(&mut self) {
        let next = self.view.back();
        self.set_view(next);
    }

    /// Creates a book without changing the view, so the editor can file a
    /// draft into it.
    pub fn create_book(&mut self, title: &str) -> Result<Book, ShellError> {
        Ok(self.notebook.create_book(title)?)
    }

    /// Saves the editor's note and shows its book's note list.
    pub fn save_note(
        &mut self,
        content: impl Into<String>,
        book_id: Option<BookId>,
    ) -> Result<Note, ShellError> {
        let existing = match &self.view {
            View::NoteEditor(EditorSession {
                target: EditorTarget::Existing(note_id),
                ..
            }) => Some(*note_id),
            View::NoteEditor(EditorSession {
                target: EditorTarget::Draft { .. },
                ..
            }) => None,
            View::NoteEditor(EditorSession {
                target: EditorTarget::Extracting { .. },
                ..
            }) => return Err(ShellError::Busy),
            other => {
                return Err(NavigationError::InvalidTransition {
                    from: other.name(),
                    action: "save a note",
                }
                .into())
            }
        };

        let note = self.notebook.save_note(NoteDraft {
            existing,
            book_id,
            content: content.into(),
        })?;
        self.set_view(View::NoteList {
            book_id: note.book_id,
        });
        Ok(note)
    }

    pub fn request_book_deletion(&self, book_id: BookId) -> Result<DeletionRequest, ShellError> {
        if self.notebook.book(book_id).is_none() {
            return Err(ServiceError::BookNotFound(book_id).into());
        }
        Ok(DeletionRequest::Book {
            book_id,
            note_count: self.notebook.notes_in_book(book_id).len(),
        })
    }

    pub fn request_note_deletion(&self, note_id: NoteId) -> Result<DeletionRequest, ShellError> {
        if self.notebook.note(note_id).is_none() {
            return Err(ServiceError::NoteNotFound(note_id).into());
        }
        Ok(DeletionRequest::Note { note_id })
    }

    /// Applies a confirmed deletion and repairs the view.
    pub fn confirm_deletion(&mut self, request: DeletionRequest) -> Result<(), ShellError> {
        match request {
            DeletionRequest::Book { book_id, .. } => {
                self.notebook.delete_book(book_id)?;
            }
            DeletionRequest::Note { note_id } => {
                self.notebook.delete_note(note_id)?;
            }
        }
        self.revalidate_view();
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, ShellError> {
        Ok(self.notebook.toggle_theme()?)
    }

    /// Falls back when the view references a book or note that is gone.
    pub fn revalidate_view(&mut self) {
        let book_alive = |book: Option<BookId>| match book {
            Some(book_id) => self.notebook.book(book_id).is_some(),
            None => true,
        };

        let repaired = match &self.view {
            View::BookList => None,
            View::NoteList { book_id } => {
                (!book_alive(Some(*book_id))).then_some(View::BookList)
            }
            View::Camera { origin_book } => (!book_alive(*origin_book)).then_some(View::BookList),
            View::NoteEditor(EditorSession {
                origin_book,
                target,
            }) => {
                if !book_alive(*origin_book) {
                    Some(View::BookList)
                } else if let EditorTarget::Existing(note_id) = target {
                    self.notebook
                        .note(*note_id)
                        .is_none()
                        .then(|| list_view_for(*origin_book))
                } else {
                    None
                }
            }
        };

        if let Some(view) = repaired {
            info!(
                "event=view_repair module=shell status=ok from={} to={}",
                self.view.name(),
                view.name()
            );
            self.set_view(view);
        }
    }

    fn set_view(&mut self, next: View) {
        if !matches!(next, View::Camera { .. }) {
            if let Some(mut session) = self.capture.take() {
                session.close();
            }
        }
        debug!(
            "event=navigate module=shell status=ok from={} to={}",
            self.view.name(),
            next.name()
        );
        self.view = next;
    }
}
