//! Error types for gyp-rs.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for gyp-rs operations.
pub type Result<T> = std::result::Result<T, GypError>;

/// Errors that can occur while loading or resolving a build description.
#[derive(Error, Debug)]
pub enum GypError {
    /// Failed to read or write a file.
    #[error("IO Error: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a well-formed literal, or has the wrong shape.
    #[error("Malformed build description: {0}")]
    Malformed(String),

    /// A condition string failed to parse.
    #[error("Failed to parse condition '{expression}': {message}")]
    Condition { expression: String, message: String },

    /// No target carries the requested name.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// More than one target carries the requested name.
    #[error("Target '{name}' is defined {count} times")]
    AmbiguousTarget { name: String, count: usize },

    /// A key needed for resolution is absent from the document.
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// The build tool's OS identifier has no platform token.
    #[error("Unrecognized OS identifier: {0}")]
    UnknownOs(String),

    /// Nested `conditions` kept appearing past the round limit.
    #[error("Nested conditions still pending after {0} rounds")]
    TooManyRounds(usize),

    /// A resource template references a key with no substitution.
    #[error("Template references unknown key '@{0}@'")]
    UnknownTemplateKey(String),
}

/// Coarse classification of a [`GypError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Target, OS identifier or document key could not be found.
    Lookup,
    /// Several targets share one name.
    Ambiguity,
    /// The document (or a condition inside it) could not be understood.
    Malformed,
    /// Filesystem failure.
    Io,
}

impl GypError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GypError::Io { .. } => ErrorKind::Io,
            GypError::Malformed(_)
            | GypError::Condition { .. }
            | GypError::TooManyRounds(_)
            | GypError::UnknownTemplateKey(_) => ErrorKind::Malformed,
            GypError::TargetNotFound(_) | GypError::MissingKey(_) | GypError::UnknownOs(_) => {
                ErrorKind::Lookup
            }
            GypError::AmbiguousTarget { .. } => ErrorKind::Ambiguity,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GypError::Io {
            path: path.into(),
            source,
        }
    }
}
