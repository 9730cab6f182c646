//! Error types for collision detection.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Lexical failure reported by the lexer, before a file path is attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} on line {line}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// A file that could not be read or tokenized.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unable to get contents of {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: LexError,
    },

    #[error("Unable to list {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl ParseError {
    pub fn path(&self) -> &Path {
        match self {
            ParseError::Unreadable { path, .. }
            | ParseError::Syntax { path, .. }
            | ParseError::Walk { path, .. } => path.as_path(),
        }
    }
}

/// Invalid configuration, raised before any file is scanned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Provided config filepath is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Failure while opening config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failure while parsing JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Provided directory to scan \"{}\" is not directory nor a file", .0.display())]
    InvalidPath(PathBuf),

    #[error("Unable to resolve path \"{}\": {source}", .path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal outcome of a detection run.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}
