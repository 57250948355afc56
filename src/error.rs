use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which command-line input a path was supplied as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    ExecFile,
    ClassFiles,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::ExecFile => f.write_str("exec file"),
            InputKind::ClassFiles => f.write_str("classfiles path"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MinicovError {
    #[error("{kind} does not exist: {}", path.display())]
    PathNotFound { kind: InputKind, path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Analysis of {} failed: {message}", path.display())]
    Analysis { path: PathBuf, message: String },

    #[error("Failed to write report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MinicovError>;
