use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {path}\nreason: {message}")]
    IoPath { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed attribute '{attribute}' on {resource}: {message}")]
    MalformedAttribute {
        resource: String,
        attribute: String,
        message: String,
    },

    #[error("malformed reference '{0}' (expected \"@type.name.attribute\")")]
    MalformedReference(String),

    #[error("resource {resource} uses undeclared provider '{provider}'")]
    UnknownProvider { resource: String, provider: String },

    #[error("template error: {file}\nreason: {message}")]
    TemplateError { file: PathBuf, message: String },

    #[error("template expansion error: {0}")]
    TemplateRenderError(String),

    #[error(
        "project root not found\nsearch started at: {0}\nhint: run inside a directory containing ground.kdl"
    )]
    ProjectRootNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, CoreError>;
