// src/error.rs
//! Error kinds surfaced by the analysis pipeline and its collaborators.
//!
//! Language detection and stemming never fail from the caller's point of view:
//! both resolve to a fallback locally (see `lang::DetectionSource` and
//! `stem::StemError`), so they have no variant here.

use crate::lang::Language;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, AbsaError>;

#[derive(Debug, thiserror::Error)]
pub enum AbsaError {
    /// A sentiment scorer could not be constructed. Fatal before any review runs.
    #[error("sentiment model unavailable for '{language}': {reason}")]
    ModelUnavailable { language: Language, reason: String },

    /// A constructed scorer failed on one input. Surfaced per review / per row.
    #[error("scorer '{scorer}' failed: {reason}")]
    ScorerInvocation { scorer: String, reason: String },

    /// Batch input could not be read or parsed as a table.
    #[error("unreadable file {path}: {reason}")]
    UnreadableFile { path: String, reason: String },

    /// No header matched the known text column names and no text column exists.
    #[error("no text column found (headers: {headers:?})")]
    NoTextColumnFound { headers: Vec<String> },

    #[error("unknown aspect '{aspect}' for '{language}'{}", suggestion_suffix(.suggestion))]
    UnknownAspect {
        language: Language,
        aspect: String,
        suggestion: Option<String>,
    },

    #[error("aspect '{aspect}' already exists for '{language}'")]
    DuplicateAspect { language: Language, aspect: String },

    #[error("invalid keyword '{keyword}': {reason}")]
    InvalidKeyword { keyword: String, reason: String },

    /// Writing the batch result table failed.
    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),
}

fn suggestion_suffix(s: &Option<String>) -> String {
    match s {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

impl AbsaError {
    pub fn scorer(scorer: impl Into<String>, reason: impl ToString) -> Self {
        Self::ScorerInvocation {
            scorer: scorer.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable short code, used in API error bodies and batch failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::ScorerInvocation { .. } => "scorer_invocation",
            Self::UnreadableFile { .. } => "unreadable_file",
            Self::NoTextColumnFound { .. } => "no_text_column",
            Self::UnknownAspect { .. } => "unknown_aspect",
            Self::DuplicateAspect { .. } => "duplicate_aspect",
            Self::InvalidKeyword { .. } => "invalid_keyword",
            Self::Export(_) => "export",
            Self::Config(_) => "config",
        }
    }
}
