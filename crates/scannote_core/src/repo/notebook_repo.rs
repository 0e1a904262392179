//! Typed notebook entries on top of a key-value repository.
//!
//! # Responsibility
//! - Encode/decode the `books` and `notes` collections as JSON arrays.
//! - Store the theme flag as a plain `light`/`dark` string.
//!
//! # Invariants
//! - Missing entries load as empty collections.
//! - Decoded collections have unique ids; duplicates are rejected.
//! - Each entry is written independently; there is no cross-entry commit.

use crate::model::book::Book;
use crate::model::note::Note;
use crate::model::theme::Theme;
use crate::repo::kv_repo::{KeyValueRepository, RepoError, RepoResult};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

pub const THEME_KEY: &str = "theme";
pub const BOOKS_KEY: &str = "books";
pub const NOTES_KEY: &str = "notes";

/// Typed access to the three persisted notebook entries.
pub struct NotebookRepository<K: KeyValueRepository> {
    kv: K,
}

impl<K: KeyValueRepository> NotebookRepository<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Loads all books, or an empty list when nothing was saved yet.
    pub fn load_books(&self) -> RepoResult<Vec<Book>> {
        let books: Vec<Book> = self.load_collection(BOOKS_KEY)?;
        ensure_unique_ids(BOOKS_KEY, books.iter().map(|book| book.id))?;
        for book in &books {
            book.validate().map_err(|err| RepoError::InvalidData {
                key: BOOKS_KEY,
                message: format!("book {}: {err}", book.id),
            })?;
        }
        Ok(books)
    }

    pub fn save_books(&self, books: &[Book]) -> RepoResult<()> {
        self.save_collection(BOOKS_KEY, books)
    }

    /// Loads all notes, or an empty list when nothing was saved yet.
    pub fn load_notes(&self) -> RepoResult<Vec<Note>> {
        let notes: Vec<Note> = self.load_collection(NOTES_KEY)?;
        ensure_unique_ids(NOTES_KEY, notes.iter().map(|note| note.id))?;
        Ok(notes)
    }

    pub fn save_notes(&self, notes: &[Note]) -> RepoResult<()> {
        self.save_collection(NOTES_KEY, notes)
    }

    /// Loads the theme flag.
    ///
    /// Falls back to the system preference when nothing is stored. A stored
    /// value other than `dark` reads as `light`.
    pub fn load_theme(&self, system_prefers_dark: bool) -> RepoResult<Theme> {
        match self.kv.load(THEME_KEY)? {
            None => Ok(Theme::from_system_preference(system_prefers_dark)),
            Some(raw) => Ok(Theme::parse(&raw).unwrap_or_else(|| {
                warn!("event=theme_load module=repo status=fallback reason=unknown_value");
                Theme::Light
            })),
        }
    }

    pub fn save_theme(&self, theme: Theme) -> RepoResult<()> {
        self.kv.save(THEME_KEY, theme.as_str())
    }

    fn load_collection<T: DeserializeOwned>(&self, key: &'static str) -> RepoResult<Vec<T>> {
        let Some(raw) = self.kv.load(key)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|err| RepoError::InvalidData {
            key,
            message: err.to_string(),
        })
    }

    fn save_collection<T: Serialize>(&self, key: &'static str, items: &[T]) -> RepoResult<()> {
        let encoded = serde_json::to_string(items).map_err(|err| RepoError::InvalidData {
            key,
            message: err.to_string(),
        })?;
        self.kv.save(key, &encoded)
    }
}

fn ensure_unique_ids(key: &'static str, ids: impl Iterator<Item = Uuid>) -> RepoResult<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(RepoError::InvalidData {
                key,
                message: format!("duplicate id {id}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NotebookRepository, BOOKS_KEY, THEME_KEY};
    use crate::db::open_db_in_memory;
    use crate::model::theme::Theme;
    use crate::repo::kv_repo::{KeyValueRepository, RepoError, SqliteKeyValueRepository};

    fn repo() -> NotebookRepository<SqliteKeyValueRepository> {
        let kv = SqliteKeyValueRepository::try_new(open_db_in_memory().unwrap()).unwrap();
        NotebookRepository::new(kv)
    }

    #[test]
    fn empty_store_loads_empty_collections() {
        let repo = repo();
        assert!(repo.load_books().unwrap().is_empty());
        assert!(repo.load_notes().unwrap().is_empty());
    }

    #[test]
    fn theme_defaults_to_system_preference_then_persists() {
        let repo = repo();
        assert_eq!(repo.load_theme(true).unwrap(), Theme::Dark);
        assert_eq!(repo.load_theme(false).unwrap(), Theme::Light);

        repo.save_theme(Theme::Dark).unwrap();
        assert_eq!(repo.load_theme(false).unwrap(), Theme::Dark);
    }

    #[test]
    fn unknown_theme_value_reads_as_light() {
        let repo = repo();
        repo.kv.save(THEME_KEY, "sepia").unwrap();
        assert_eq!(repo.load_theme(true).unwrap(), Theme::Light);
    }

    #[test]
    fn corrupt_books_entry_is_rejected() {
        let repo = repo();
        repo.kv.save(BOOKS_KEY, "{not json").unwrap();
        let err = repo.load_books().unwrap_err();
        assert!(matches!(err, RepoError::InvalidData { key: "books", .. }));
    }

    #[test]
    fn duplicate_book_ids_are_rejected() {
        let repo = repo();
        let raw = r#"[
            {"id":"6f1c3f36-7c1b-4a43-9a51-2f0e1c1b7a10","title":"a","createdAt":1},
            {"id":"6f1c3f36-7c1b-4a43-9a51-2f0e1c1b7a10","title":"b","createdAt":2}
        ]"#;
        repo.kv.save(BOOKS_KEY, raw).unwrap();
        let err = repo.load_books().unwrap_err();
        assert!(err.to_string().contains("duplicate id"));
    }
}
