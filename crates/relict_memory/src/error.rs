//! Error types for state persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while writing engine state to disk. Loading never fails; it falls
/// back to defaults instead.
#[derive(Error, Debug)]
pub enum PersistError {
    /// No state path was configured.
    #[error("No state path configured")]
    NoPath,

    /// Could not create the parent directory or the temporary file.
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PersistError>;
