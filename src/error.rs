use thiserror::Error;

use crate::services::storage::StorageError;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, UploadError>;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Incomplete upload. Expected {expected} parts, got {received}")]
    IncompleteUpload { expected: i64, received: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to read upload source: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// True when the failure means no tracking record exists for the key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UploadError::Store(StoreError::NotFound(_)))
    }

    /// True for caller mistakes that retrying cannot fix.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidArgument(_) | UploadError::Store(StoreError::InvalidArgument(_))
        )
    }
}
