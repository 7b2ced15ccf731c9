use std::{io, path::PathBuf};
use thiserror::Error;

/// The persisted file exists but could not be turned back into a store.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The in-memory mapping could not be written out.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to encode store: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// No record exists under the requested short id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("short id '{0}' not found")]
pub struct NotFound(pub String);
