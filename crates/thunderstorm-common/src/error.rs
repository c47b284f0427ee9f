//! Engine-wide error taxonomy
//!
//! Every fallible operation in the ThunderStorm crates reports one of these.
//! Low-level parse failures carry their exact position; document-level
//! operations wrap them in `FileDeserialize` / `FileSerialize` so callers see
//! both which file failed and why (`std::error::Error::source` walks the chain).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open file {path:?}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read from {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to {path:?}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {path:?} is not a unicode text file")]
    FileNotUnicode { path: PathBuf },

    #[error("Invalid format in {path:?}: {reason}")]
    FileFormat { path: PathBuf, reason: String },

    #[error("Parse error in {path:?} at line {line}, column {column}: expected {expected}")]
    FileParse {
        path: PathBuf,
        line: usize,
        column: usize,
        expected: String,
    },

    #[error("Failed to deserialize {path:?}")]
    FileDeserialize {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to serialize {path:?}")]
    FileSerialize {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Required element \"{element}\" not found in {path:?}")]
    FileElement { path: PathBuf, element: String },

    #[error("Element \"{element}\" in {path:?} has the wrong format, expected {expected}")]
    FileElementFormat {
        path: PathBuf,
        element: String,
        expected: String,
    },

    #[error("Memory allocation failed: {0}")]
    MemAlloc(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid pointer: {0}")]
    InvalidPtr(String),

    #[error("Index {index} out of range (count {count})")]
    InvalidIndex { index: usize, count: usize },

    #[error("Invalid call: {0}")]
    InvalidCall(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error kind without payload, for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileOpen,
    FileRead,
    FileWrite,
    FileNotUnicode,
    FileFormat,
    FileParse,
    FileDeserialize,
    FileSerialize,
    FileElement,
    FileElementFormat,
    MemAlloc,
    InvalidParam,
    InvalidPtr,
    InvalidIndex,
    InvalidCall,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileOpen { .. } => ErrorKind::FileOpen,
            Error::FileRead { .. } => ErrorKind::FileRead,
            Error::FileWrite { .. } => ErrorKind::FileWrite,
            Error::FileNotUnicode { .. } => ErrorKind::FileNotUnicode,
            Error::FileFormat { .. } => ErrorKind::FileFormat,
            Error::FileParse { .. } => ErrorKind::FileParse,
            Error::FileDeserialize { .. } => ErrorKind::FileDeserialize,
            Error::FileSerialize { .. } => ErrorKind::FileSerialize,
            Error::FileElement { .. } => ErrorKind::FileElement,
            Error::FileElementFormat { .. } => ErrorKind::FileElementFormat,
            Error::MemAlloc(_) => ErrorKind::MemAlloc,
            Error::InvalidParam(_) => ErrorKind::InvalidParam,
            Error::InvalidPtr(_) => ErrorKind::InvalidPtr,
            Error::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            Error::InvalidCall(_) => ErrorKind::InvalidCall,
        }
    }

    /// Innermost error of a `FileDeserialize` / `FileSerialize` chain
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::FileDeserialize { source, .. } | Error::FileSerialize { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Re-point path-carrying errors at `path`.
    ///
    /// The element parser has no idea which file it is reading; the document
    /// fills the path in when it catches the failure.
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Error::FileOpen { path, .. }
            | Error::FileRead { path, .. }
            | Error::FileWrite { path, .. }
            | Error::FileNotUnicode { path }
            | Error::FileFormat { path, .. }
            | Error::FileParse { path, .. }
            | Error::FileDeserialize { path, .. }
            | Error::FileSerialize { path, .. }
            | Error::FileElement { path, .. }
            | Error::FileElementFormat { path, .. } => *path = new_path.into(),
            _ => {}
        }
        self
    }
}
