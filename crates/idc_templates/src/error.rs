//! Error types for templates.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template operations.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Variable not provided: {0}")]
    MissingVariable(String),

    #[error("Template rendering failed: {0}")]
    RenderingFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
