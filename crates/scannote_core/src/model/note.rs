//! Note domain model.
//!
//! # Responsibility
//! - Define the text document owned by exactly one book.
//! - Provide edit semantics (`apply_edit`) and list snippets.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `updated_at` strictly increases on every edit.
//! - `book_id` references a live book; cascade delete keeps this true.

use crate::model::book::BookId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Stable identifier for a note.
pub type NoteId = Uuid;

const SNIPPET_MAX_CHARS: usize = 100;
const EMPTY_SNIPPET: &str = "Empty Note";

/// Single text document belonging to one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub book_id: BookId,
    /// Raw text, stored as entered (not trimmed).
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Equal to `created_at` until the first edit.
    pub updated_at: i64,
}

impl Note {
    /// Creates a note with a generated id.
    ///
    /// # Errors
    /// - `ValidationError::EmptyContent` when `content` is blank.
    pub fn new(
        book_id: BookId,
        content: impl Into<String>,
        now_ms: i64,
    ) -> Result<Self, ValidationError> {
        let content = content.into();
        ensure_content(&content)?;
        Ok(Self {
            id: Uuid::new_v4(),
            book_id,
            content,
            created_at: now_ms,
            updated_at: now_ms,
        })
    }

    /// Replaces content and owning book, advancing `updated_at`.
    ///
    /// The new timestamp is `max(now_ms, updated_at + 1)` so an edit is
    /// observable even when the clock did not move.
    pub fn apply_edit(
        &mut self,
        book_id: BookId,
        content: impl Into<String>,
        now_ms: i64,
    ) -> Result<(), ValidationError> {
        let content = content.into();
        ensure_content(&content)?;
        self.content = content;
        self.book_id = book_id;
        self.updated_at = now_ms.max(self.updated_at.saturating_add(1));
        Ok(())
    }

    /// One-line summary for note lists.
    pub fn snippet(&self) -> String {
        let first_line = self.content.lines().next().unwrap_or("").trim();
        if first_line.is_empty() {
            return EMPTY_SNIPPET.to_string();
        }
        if first_line.chars().count() > SNIPPET_MAX_CHARS {
            let mut cut: String = first_line.chars().take(SNIPPET_MAX_CHARS).collect();
            cut.push_str("...");
            return cut;
        }
        first_line.to_string()
    }
}

/// Most recently edited first; id breaks ties.
pub fn recently_updated_first(left: &Note, right: &Note) -> Ordering {
    right
        .updated_at
        .cmp(&left.updated_at)
        .then_with(|| left.id.cmp(&right.id))
}

fn ensure_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{recently_updated_first, Note};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn new_note_starts_with_equal_timestamps() {
        let note = Note::new(Uuid::new_v4(), "hello", 500).unwrap();
        assert_eq!(note.created_at, 500);
        assert_eq!(note.updated_at, 500);
        assert_eq!(note.content, "hello");
    }

    #[test]
    fn new_note_rejects_whitespace_content() {
        let err = Note::new(Uuid::new_v4(), " \n\t", 1).unwrap_err();
        assert_eq!(err, ValidationError::EmptyContent);
    }

    #[test]
    fn edit_advances_updated_at_even_with_frozen_clock() {
        let mut note = Note::new(Uuid::new_v4(), "v1", 100).unwrap();
        let (id, created_at) = (note.id, note.created_at);

        note.apply_edit(note.book_id, "v2", 100).unwrap();
        assert_eq!(note.updated_at, 101);
        note.apply_edit(note.book_id, "v3", 900).unwrap();
        assert_eq!(note.updated_at, 900);

        assert_eq!(note.id, id);
        assert_eq!(note.created_at, created_at);
        assert_eq!(note.content, "v3");
    }

    #[test]
    fn rejected_edit_leaves_note_untouched() {
        let mut note = Note::new(Uuid::new_v4(), "keep", 1).unwrap();
        let before = note.clone();
        assert!(note.apply_edit(Uuid::new_v4(), "   ", 50).is_err());
        assert_eq!(note, before);
    }

    #[test]
    fn snippet_uses_first_line_and_truncates() {
        let book = Uuid::new_v4();
        let note = Note::new(book, "  Title line  \nbody", 1).unwrap();
        assert_eq!(note.snippet(), "Title line");

        let blank_first = Note::new(book, "\nsecond", 1).unwrap();
        assert_eq!(blank_first.snippet(), "Empty Note");

        let long = Note::new(book, "x".repeat(150), 1).unwrap();
        let snippet = long.snippet();
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 103);
    }

    #[test]
    fn recently_updated_first_orders_by_updated_at_desc() {
        let book = Uuid::new_v4();
        let stale = Note::new(book, "stale", 1).unwrap();
        let fresh = Note::new(book, "fresh", 2).unwrap();
        let mut notes = vec![stale.clone(), fresh.clone()];
        notes.sort_by(recently_updated_first);
        assert_eq!(notes, vec![fresh, stale]);
    }
}
