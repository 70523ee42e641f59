//! Engine error types

use thiserror::Error;

/// Errors raised while planning or applying
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("provider operation failed: {0}")]
    ProviderFailed(String),

    #[error("unresolved reference {reference} required by {required_by}")]
    UnresolvedReference {
        reference: String,
        required_by: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("state file error: {0}")]
    StateError(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
