//! Error types shared by parsing, synthesis and the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tablestack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single validation problem in a config file or construct tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur while loading, synthesizing or diffing stacks.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("template error: {0}")]
    Template(String),

    #[error("stack '{0}' not found")]
    UnknownStack(String),

    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{0} resource change(s) pending")]
    PendingChanges(u32),
}
