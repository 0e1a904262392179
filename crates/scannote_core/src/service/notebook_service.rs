//! Notebook use-case service.
//!
//! # Responsibility
//! - Own the in-memory `books` and `notes` collections.
//! - Validate and apply create/edit/delete commands with write-through.
//!
//! # Invariants
//! - Collections are read once at construction and mirrored on every write.
//! - Memory changes only after the store accepted the new collection.
//! - Deleting a book removes every note that references it.
//! - Failed validation leaves both collections untouched.

use crate::model::book::{newest_first, Book, BookId};
use crate::model::clock::{Clock, SystemClock};
use crate::model::note::{recently_updated_first, Note, NoteId};
use crate::model::theme::Theme;
use crate::model::validation::ValidationError;
use crate::repo::kv_repo::{KeyValueRepository, RepoError};
use crate::repo::notebook_repo::NotebookRepository;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for notebook use-cases.
#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    BookNotFound(BookId),
    NoteNotFound(NoteId),
    Repo(RepoError),
}

impl ServiceError {
    /// Alert text for the user. Storage failures stay generic.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.user_message().to_string(),
            Self::BookNotFound(_) => "This book no longer exists.".to_string(),
            Self::NoteNotFound(_) => "This note no longer exists.".to_string(),
            Self::Repo(_) => "Could not save your changes.".to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::BookNotFound(id) => write!(f, "book not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::BookNotFound(_) | Self::NoteNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Save request coming from the note editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    /// `Some` when editing an existing note, `None` for a new one.
    pub existing: Option<NoteId>,
    /// Target book chosen in the editor.
    pub book_id: Option<BookId>,
    pub content: String,
}

/// Result of a cascading book delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDeletion {
    pub book: Book,
    pub removed_notes: usize,
}

/// Owner of the notebook collections.
pub struct NotebookService<K: KeyValueRepository> {
    repo: NotebookRepository<K>,
    clock: Box<dyn Clock + Send>,
    books: Vec<Book>,
    notes: Vec<Note>,
    theme: Theme,
}

impl<K: KeyValueRepository> NotebookService<K> {
    /// Loads collections from `repo` using the system clock.
    pub fn load(
        repo: NotebookRepository<K>,
        system_prefers_dark: bool,
    ) -> Result<Self, ServiceError> {
        Self::load_with_clock(repo, system_prefers_dark, Box::new(SystemClock))
    }

    /// Loads collections from `repo` with a caller-provided clock.
    pub fn load_with_clock(
        repo: NotebookRepository<K>,
        system_prefers_dark: bool,
        clock: Box<dyn Clock + Send>,
    ) -> Result<Self, ServiceError> {
        let books = repo.load_books()?;
        let notes = repo.load_notes()?;
        let theme = repo.load_theme(system_prefers_dark)?;
        info!(
            "event=notebook_load module=service status=ok books={} notes={} theme={}",
            books.len(),
            notes.len(),
            theme.as_str()
        );
        Ok(Self {
            repo,
            clock,
            books,
            notes,
            theme,
        })
    }

    /// Books sorted newest first.
    pub fn books(&self) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.books.iter().collect();
        books.sort_by(|left, right| newest_first(left, right));
        books
    }

    /// Notes of one book, most recently updated first.
    pub fn notes_in_book(&self, book_id: BookId) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|note| note.book_id == book_id)
            .collect();
        notes.sort_by(|left, right| recently_updated_first(left, right));
        notes
    }

    pub fn book(&self, book_id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == book_id)
    }

    pub fn note(&self, note_id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == note_id)
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Creates a book from a user-entered title.
    pub fn create_book(&mut self, title: &str) -> Result<Book, ServiceError> {
        let book = Book::new(title, self.clock.now_ms())?;
        let mut next = self.books.clone();
        next.push(book.clone());
        self.commit_books(next, "book_create")?;
        info!(
            "event=book_create module=service status=ok book_id={}",
            book.id
        );
        Ok(book)
    }

    /// Deletes a book and every note that belongs to it.
    ///
    /// Notes are written before books, so an interrupted delete can leave an
    /// empty book behind but never notes without a book.
    pub fn delete_book(&mut self, book_id: BookId) -> Result<BookDeletion, ServiceError> {
        let book = self
            .book(book_id)
            .cloned()
            .ok_or(ServiceError::BookNotFound(book_id))?;

        let remaining_notes: Vec<Note> = self
            .notes
            .iter()
            .filter(|note| note.book_id != book_id)
            .cloned()
            .collect();
        let removed_notes = self.notes.len() - remaining_notes.len();
        if removed_notes > 0 {
            self.commit_notes(remaining_notes, "book_delete")?;
        }

        let remaining_books: Vec<Book> = self
            .books
            .iter()
            .filter(|candidate| candidate.id != book_id)
            .cloned()
            .collect();
        self.commit_books(remaining_books, "book_delete")?;

        info!(
            "event=book_delete module=service status=ok book_id={} removed_notes={}",
            book_id, removed_notes
        );
        Ok(BookDeletion {
            book,
            removed_notes,
        })
    }

    /// Saves an editor draft as a new note or an edit of an existing one.
    ///
    /// # Errors
    /// Checked in this order, with no state change on failure:
    /// - `NoBookSelected` when the draft has no book.
    /// - `EmptyContent` when content is blank.
    /// - `UnknownBook` when the book does not exist.
    /// - `NoteNotFound` when editing a note that no longer exists.
    pub fn save_note(&mut self, draft: NoteDraft) -> Result<Note, ServiceError> {
        let book_id = draft.book_id.ok_or(ValidationError::NoBookSelected)?;
        if draft.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        if self.book(book_id).is_none() {
            return Err(ValidationError::UnknownBook(book_id).into());
        }

        let now_ms = self.clock.now_ms();
        let mut next = self.notes.clone();
        let saved = match draft.existing {
            Some(note_id) => {
                let note = next
                    .iter_mut()
                    .find(|note| note.id == note_id)
                    .ok_or(ServiceError::NoteNotFound(note_id))?;
                note.apply_edit(book_id, draft.content, now_ms)?;
                note.clone()
            }
            None => {
                let note = Note::new(book_id, draft.content, now_ms)?;
                next.push(note.clone());
                note
            }
        };

        let action = if draft.existing.is_some() {
            "note_update"
        } else {
            "note_create"
        };
        self.commit_notes(next, action)?;
        info!(
            "event={} module=service status=ok note_id={} book_id={} content_len={}",
            action,
            saved.id,
            saved.book_id,
            saved.content.len()
        );
        Ok(saved)
    }

    pub fn delete_note(&mut self, note_id: NoteId) -> Result<Note, ServiceError> {
        let note = self
            .note(note_id)
            .cloned()
            .ok_or(ServiceError::NoteNotFound(note_id))?;
        let next: Vec<Note> = self
            .notes
            .iter()
            .filter(|candidate| candidate.id != note_id)
            .cloned()
            .collect();
        self.commit_notes(next, "note_delete")?;
        info!("event=note_delete module=service status=ok note_id={note_id}");
        Ok(note)
    }

    /// Flips and persists the theme.
    pub fn toggle_theme(&mut self) -> Result<Theme, ServiceError> {
        let next = self.theme.toggled();
        self.repo.save_theme(next)?;
        self.theme = next;
        Ok(next)
    }

    fn commit_books(&mut self, next: Vec<Book>, action: &'static str) -> Result<(), ServiceError> {
        if let Err(err) = self.repo.save_books(&next) {
            error!(
                "event={action} module=service status=error error_code=books_save_failed error={err}"
            );
            return Err(err.into());
        }
        self.books = next;
        Ok(())
    }

    fn commit_notes(&mut self, next: Vec<Note>, action: &'static str) -> Result<(), ServiceError> {
        if let Err(err) = self.repo.save_notes(&next) {
            error!(
                "event={action} module=service status=error error_code=notes_save_failed error={err}"
            );
            return Err(err.into());
        }
        self.notes = next;
        Ok(())
    }
}
