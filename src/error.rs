//! Error kinds for the enrichment pipeline.
//!
//! Each variant maps to one failure class of a batch run. Whether a failure is
//! survivable depends on where it happens: a parse failure during per-post
//! extraction skips that post, while the same failure during unification aborts
//! the batch.

use std::path::PathBuf;

use thiserror::Error;

use crate::oracle::OracleError;

/// The oracle's reply did not contain a well-formed structured object.
#[derive(Debug, Error)]
#[error("Invalid JSON content ({reason}):\n{raw}")]
pub struct ParseError {
    /// The full raw response text.
    pub raw: String,
    /// Why the response was rejected.
    pub reason: String,
}

impl ParseError {
    pub fn new(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced while enriching a batch of posts.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The source could not be read or did not hold a sequence of posts.
    #[error("Failed to load posts from {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// An oracle response could not be parsed into a structured object.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Strict mode rejected a parsed metadata object.
    #[error("Metadata failed validation: {0}")]
    Validation(String),

    /// The post has no text `caption` field.
    #[error("Post does not contain a 'caption' field")]
    MissingCaption,

    /// Every eligible post failed extraction (or none were eligible).
    #[error("No enriched posts available for processing")]
    NoEnrichedPosts,

    /// No tags were collected across the whole batch.
    #[error("No tags found to unify")]
    EmptyVocabulary,

    /// The oracle could not be reached or returned a transport-level error.
    #[error("Oracle request failed: {0}")]
    Oracle(#[from] OracleError),

    /// The enriched sequence could not be persisted.
    #[error("Failed to write posts to {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl EnrichError {
    /// Returns `true` for failures that only affect a single post.
    ///
    /// The pipeline skips the post and continues for these kinds during
    /// extraction. Everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EnrichError::Parse(_) | EnrichError::Validation(_) | EnrichError::MissingCaption
        )
    }

    /// Returns `true` when the failure was caused by the input rather than the
    /// environment (used by the binary to pick an exit code).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EnrichError::Load { .. }
                | EnrichError::MissingCaption
                | EnrichError::NoEnrichedPosts
                | EnrichError::EmptyVocabulary
        )
    }
}
