//! Error types for the fetch phase.

use thiserror::Error;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while reading Identity Center state.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Throttled during {operation} after {attempts} attempt(s)")]
    Throttled { operation: String, attempts: u32 },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("AWS API error during {operation}: {message}")]
    Api { operation: String, message: String },

    #[error("No IAM Identity Center instance found")]
    NoInstance,

    #[error("Invalid data from {source_name}: {message}")]
    InvalidData { source_name: String, message: String },

    #[error("Snapshot error: {0}")]
    Model(#[from] idc_model::ModelError),
}

impl FetchError {
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn throttled(operation: impl Into<String>) -> Self {
        FetchError::Throttled {
            operation: operation.into(),
            attempts: 1,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        FetchError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, FetchError::Throttled { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }
}
