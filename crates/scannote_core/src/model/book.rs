//! Book domain model.
//!
//! # Responsibility
//! - Define the user-created folder that owns notes.
//! - Provide newest-first ordering used by list views.
//!
//! # Invariants
//! - `id` is unique across all books and never reused.
//! - `title` is trimmed and non-empty.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Stable identifier for a book.
pub type BookId = Uuid;

/// User-defined collection of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    /// Display title, stored trimmed.
    pub title: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Book {
    /// Creates a book with a generated id.
    ///
    /// # Errors
    /// - `ValidationError::EmptyBookTitle` when `title` is blank.
    pub fn new(title: &str, now_ms: i64) -> Result<Self, ValidationError> {
        let title = normalize_title(title).ok_or(ValidationError::EmptyBookTitle)?;
        Ok(Self {
            id: Uuid::new_v4(),
            title,
            created_at: now_ms,
        })
    }

    /// Validates a book read back from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyBookTitle);
        }
        Ok(())
    }
}

/// Newest first; id breaks ties so the order is stable across reloads.
pub fn newest_first(left: &Book, right: &Book) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| left.id.cmp(&right.id))
}

fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{newest_first, Book};
    use crate::model::validation::ValidationError;

    #[test]
    fn new_book_trims_title() {
        let book = Book::new("  Field notes \n", 10).unwrap();
        assert_eq!(book.title, "Field notes");
        assert_eq!(book.created_at, 10);
    }

    #[test]
    fn new_book_rejects_blank_title() {
        let err = Book::new(" \t ", 10).unwrap_err();
        assert_eq!(err, ValidationError::EmptyBookTitle);
    }

    #[test]
    fn newest_first_orders_by_created_at_desc() {
        let older = Book::new("older", 1).unwrap();
        let newer = Book::new("newer", 2).unwrap();
        let mut books = vec![older.clone(), newer.clone()];
        books.sort_by(newest_first);
        assert_eq!(books, vec![newer, older]);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let book = Book::new("T", 42).unwrap();
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["createdAt"], 42);
        assert_eq!(json["title"], "T");
        assert!(json.get("created_at").is_none());
    }
}
