use std::fmt;
use crate::core::types::{DocId, PodKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    InvalidArgument,
    /// Vector store or positional index file missing for a pod
    PodNotFound,
    /// Url or id absent from the registry
    DocumentNotFound,
    /// Tokenizer/vectorizer could not produce a usable vector; nothing was mutated
    VectorizationFailed,
    /// Row/record/postings divergence found during a live operation
    InconsistentState,
    /// Store directory held by another process
    Locked,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn pod_not_found(pod: &PodKey) -> Self {
        Error::new(ErrorKind::PodNotFound, format!("No store files for pod {}", pod))
    }

    pub fn document_not_found(id: DocId) -> Self {
        Error::new(ErrorKind::DocumentNotFound, format!("Document {} not found", id))
    }

    pub fn url_not_found(url: &str) -> Self {
        Error::new(ErrorKind::DocumentNotFound, format!("No document at url '{}'", url))
    }

    pub fn vectorization(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::VectorizationFailed, context.into())
    }

    pub fn inconsistent(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InconsistentState, context.into())
    }

    pub fn is_pod_not_found(&self) -> bool {
        self.kind == ErrorKind::PodNotFound
    }

    pub fn is_inconsistent(&self) -> bool {
        self.kind == ErrorKind::InconsistentState
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("JSON error: {}", err),
        }
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("FST error: {}", err),
        }
    }
}

impl From<lz4_flex::block::DecompressError> for Error {
    fn from(err: lz4_flex::block::DecompressError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("LZ4 error: {}", err),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
