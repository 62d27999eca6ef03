//! Error types for the snapshot model.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while loading, storing or checking a snapshot.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Snapshot not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Invalid snapshot format in file {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error("Snapshot invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the elevated-access entity resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid entity type: '{0}' (expected Account, OU, User or Group)")]
    InvalidEntityType(String),

    #[error("{kind} '{name}' not found in snapshot")]
    NotFound { kind: String, name: String },
}
