use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of lexicon store and editing operations.
///
/// Text processing never fails; only operations that validate input or touch
/// the filesystem return this type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field is missing or blank. Nothing was mutated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced key or backup file does not exist. Nothing was mutated.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading, writing or renaming a persisted file failed.
    ///
    /// The previously committed file survives because writes go through a
    /// temp file and an atomic rename.
    #[error("storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A restore target that is not valid JSON, or whose `dictionary` field
    /// is missing or not a mapping.
    #[error("corrupt backup {file}: {reason}")]
    CorruptBackup { file: String, reason: String },
}

impl StoreError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        StoreError::Storage {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
