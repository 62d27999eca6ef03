//! Error types for Terraform generation.

use thiserror::Error;

/// Result type alias for generation operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while generating Terraform.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Template render error: {0}")]
    TemplateRender(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Entity resolution failed: {0}")]
    Resolve(#[from] idc_model::ResolveError),

    #[error("Provider registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Model(#[from] idc_model::ModelError),

    #[error("Template error: {0}")]
    Template(#[from] idc_templates::TemplateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IacError {
    /// Errors caused by the snapshot contents or templates rather than I/O.
    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            IacError::TemplateRender(_) | IacError::Resolve(_) | IacError::Template(_)
        )
    }
}
