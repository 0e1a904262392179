//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep shell/FFI layers decoupled from storage details.

pub mod notebook_service;
