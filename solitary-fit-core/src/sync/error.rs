//! Sync error types.

use thiserror::Error;

use crate::repository::RepositoryError;

/// Why a single date failed to sync.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Every write attempt to the destination failed; `cause` is the last one.
    #[error("Write failed after {attempts} attempt(s): {cause}")]
    WriteFailed {
        attempts: u32,
        cause: RepositoryError,
    },

    /// The source's metadata lists the date but the record could not be read.
    /// Not retried: the source itself is inconsistent.
    #[error(
        "Source metadata is out of sync with its data: {}",
        .read_error.as_ref().map_or_else(|| "record missing".to_string(), ToString::to_string)
    )]
    MetadataOutOfSync { read_error: Option<RepositoryError> },
}

impl SyncError {
    /// True for failures that retrying the sync cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::MetadataOutOfSync { .. })
    }

    /// The underlying repository error, if there was one.
    pub fn cause(&self) -> Option<&RepositoryError> {
        match self {
            SyncError::WriteFailed { cause, .. } => Some(cause),
            SyncError::MetadataOutOfSync { read_error } => read_error.as_ref(),
        }
    }
}
