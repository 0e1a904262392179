//! Notebook domain model.
//!
//! # Responsibility
//! - Define the two persisted collections (books, notes) and the theme flag.
//! - Own field-level validation shared by service and persistence paths.
//!
//! # Invariants
//! - Every record is identified by a stable UUID v4.
//! - Timestamps are Unix epoch milliseconds.
//! - Display ordering is computed by readers, never stored.

pub mod book;
pub mod clock;
pub mod note;
pub mod theme;
pub mod validation;
