//! Validation failures that block a save and leave state unchanged.

use crate::model::book::BookId;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Note content is empty or whitespace-only.
    EmptyContent,
    /// A note save was attempted with no target book.
    NoBookSelected,
    /// Book title is empty or whitespace-only.
    EmptyBookTitle,
    /// Target book does not exist (deleted or never created).
    UnknownBook(BookId),
}

impl ValidationError {
    /// Alert text shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyContent => "Note content cannot be empty.",
            Self::NoBookSelected => "Please select or create a book to save the note.",
            Self::EmptyBookTitle => "Book title cannot be empty.",
            Self::UnknownBook(_) => "The selected book no longer exists.",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "note content must not be blank"),
            Self::NoBookSelected => write!(f, "no book selected for note"),
            Self::EmptyBookTitle => write!(f, "book title must not be blank"),
            Self::UnknownBook(id) => write!(f, "book not found: {id}"),
        }
    }
}

impl Error for ValidationError {}
