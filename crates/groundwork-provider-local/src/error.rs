use std::path::PathBuf;
use thiserror::Error;

/// Local provider errors
#[derive(Error, Debug)]
pub enum LocalError {
    #[error("record directory unavailable: {path}\nreason: {message}")]
    RootUnavailable { path: PathBuf, message: String },

    #[error("corrupt record: {path}\nreason: {message}")]
    CorruptRecord { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LocalError>;
