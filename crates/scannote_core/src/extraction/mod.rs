//! Text extraction collaborator.
//!
//! # Responsibility
//! - Define the `TextExtractor` seam used by the shell.
//! - Collapse every failure into one user-facing communication error.
//!
//! # Invariants
//! - One request per call; no retry, no streaming, no partial results.
//! - No side effect beyond the outbound request.

mod gemini;

pub use gemini::{GeminiConfig, GeminiExtractor, EXTRACTION_PROMPT};

use crate::capture::StillImage;
use std::error::Error;
use std::fmt::{Display, Formatter};

const COMMUNICATION_FAILURE_MESSAGE: &str = "Failed to communicate with the AI model.";

/// Extracts text from one still image.
pub trait TextExtractor {
    fn extract(&self, image: &StillImage) -> Result<String, ExtractionError>;
}

/// Single generic extraction failure.
///
/// `details` is kept for diagnostics only; callers must not branch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionError {
    details: String,
}

impl ExtractionError {
    pub fn communication(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn user_message(&self) -> &'static str {
        COMMUNICATION_FAILURE_MESSAGE
    }
}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{COMMUNICATION_FAILURE_MESSAGE}")
    }
}

impl Error for ExtractionError {}
