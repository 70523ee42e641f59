use thiserror::Error;

/// Graph construction and ordering errors
///
/// All of these are configuration errors: they are raised before any
/// provider operation runs.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("missing dependency: {target} required by {required_by}")]
    MissingDependency { target: String, required_by: String },

    #[error("duplicate resource declaration: {0}")]
    DuplicateResource(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;
