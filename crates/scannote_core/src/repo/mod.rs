//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value contract the notebook is persisted through.
//! - Map typed collections to stored entries and back.
//!
//! # Invariants
//! - Stored values that fail to decode surface as `RepoError::InvalidData`;
//!   corrupt state is never silently replaced with defaults.

pub mod kv_repo;
pub mod notebook_repo;
