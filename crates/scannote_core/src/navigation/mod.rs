//! Navigation state machine.
//!
//! # Responsibility
//! - Model the four views as a tagged union carrying only what each needs.
//! - Define user-driven transitions and context-sensitive back navigation.
//!
//! # Invariants
//! - Transitions are pure: they never look at the collections. Dangling
//!   references are repaired by the shell (`AppShell::revalidate_view`).
//! - Back from `NoteEditor` / `Camera` returns to the originating book's
//!   `NoteList`, or `BookList` when no book was selected.

use crate::model::book::BookId;
use crate::model::note::NoteId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Monotonic id of one in-flight extraction.
pub type ExtractionTicket = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    BookList,
    NoteList { book_id: BookId },
    NoteEditor(EditorSession),
    Camera { origin_book: Option<BookId> },
}

/// Editor context: where it was opened from and what it edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSession {
    pub origin_book: Option<BookId>,
    pub target: EditorTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorTarget {
    Existing(NoteId),
    /// New, unsaved note. Blank or pre-filled with extracted text.
    Draft { content: String },
    /// Waiting for an extraction result; blocks further capture.
    Extracting { ticket: ExtractionTicket },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

impl Display for NavigationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTransition { from, action } => {
                write!(f, "cannot {action} from {from} view")
            }
        }
    }
}

impl Error for NavigationError {}

impl View {
    /// Stable name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BookList => "book_list",
            Self::NoteList { .. } => "note_list",
            Self::NoteEditor(_) => "note_editor",
            Self::Camera { .. } => "camera",
        }
    }

    /// Book whose note list this view returns to, if any.
    pub fn selected_book(&self) -> Option<BookId> {
        match self {
            Self::BookList => None,
            Self::NoteList { book_id } => Some(*book_id),
            Self::NoteEditor(session) => session.origin_book,
            Self::Camera { origin_book } => *origin_book,
        }
    }

    /// Ticket of the pending extraction, if the editor is waiting for one.
    pub fn pending_extraction(&self) -> Option<ExtractionTicket> {
        match self {
            Self::NoteEditor(EditorSession {
                target: EditorTarget::Extracting { ticket },
                ..
            }) => Some(*ticket),
            _ => None,
        }
    }

    /// `BookList --select book--> NoteList`.
    pub fn select_book(&self, book_id: BookId) -> Result<View, NavigationError> {
        match self {
            Self::BookList => Ok(Self::NoteList { book_id }),
            other => Err(other.invalid("select a book")),
        }
    }

    /// `NoteList --select note--> NoteEditor(Existing)`.
    pub fn select_note(&self, note_id: NoteId) -> Result<View, NavigationError> {
        match self {
            Self::NoteList { book_id } => Ok(Self::NoteEditor(EditorSession {
                origin_book: Some(*book_id),
                target: EditorTarget::Existing(note_id),
            })),
            other => Err(other.invalid("select a note")),
        }
    }

    /// `BookList | NoteList --new note--> NoteEditor(Draft "")`.
    pub fn new_note(&self) -> Result<View, NavigationError> {
        match self {
            Self::BookList | Self::NoteList { .. } => Ok(Self::NoteEditor(EditorSession {
                origin_book: self.selected_book(),
                target: EditorTarget::Draft {
                    content: String::new(),
                },
            })),
            other => Err(other.invalid("start a new note")),
        }
    }

    /// `BookList | NoteList --scan--> Camera`.
    pub fn open_camera(&self) -> Result<View, NavigationError> {
        match self {
            Self::BookList | Self::NoteList { .. } => Ok(Self::Camera {
                origin_book: self.selected_book(),
            }),
            other => Err(other.invalid("open the camera")),
        }
    }

    /// `Camera --capture success--> NoteEditor(Extracting)`.
    pub fn begin_extraction(&self, ticket: ExtractionTicket) -> Result<View, NavigationError> {
        match self {
            Self::Camera { origin_book } => Ok(Self::NoteEditor(EditorSession {
                origin_book: *origin_book,
                target: EditorTarget::Extracting { ticket },
            })),
            other => Err(other.invalid("capture an image")),
        }
    }

    /// `NoteEditor(Extracting) --text--> NoteEditor(Draft text)`.
    pub fn fill_extracted(&self, content: String) -> Result<View, NavigationError> {
        match self {
            Self::NoteEditor(EditorSession {
                origin_book,
                target: EditorTarget::Extracting { .. },
            }) => Ok(Self::NoteEditor(EditorSession {
                origin_book: *origin_book,
                target: EditorTarget::Draft { content },
            })),
            other => Err(other.invalid("apply extracted text")),
        }
    }

    /// Context-sensitive back navigation. Always succeeds.
    pub fn back(&self) -> View {
        match self {
            Self::BookList | Self::NoteList { .. } => Self::BookList,
            Self::NoteEditor(EditorSession { origin_book, .. })
            | Self::Camera { origin_book } => list_view_for(*origin_book),
        }
    }

    fn invalid(&self, action: &'static str) -> NavigationError {
        NavigationError::InvalidTransition {
            from: self.name(),
            action,
        }
    }
}

/// `NoteList(book)` when a book is selected, otherwise `BookList`.
pub fn list_view_for(book: Option<BookId>) -> View {
    match book {
        Some(book_id) => View::NoteList { book_id },
        None => View::BookList,
    }
}
