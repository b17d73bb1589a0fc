//! Upload tracking store.
//!
//! Keeps, per upload key, the object store's upload id, the declared number
//! of parts and the parts received so far. Every backend must honour the
//! contract of [`UploadStore`]; [`InMemoryUploadStore`] is the default.

mod memory;

pub use memory::{InMemoryUploadStore, StaleUpload};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of parts in a chunked upload.
pub const MAX_PARTS: i64 = 10_000;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upload not found: {0}")]
    NotFound(String),

    #[error("Upload already exists: {0}")]
    AlreadyExists(String),

    #[error("Upload was restarted under key: {0}")]
    Restarted(String),
}

/// A received chunk and the integrity tag the object store issued for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletedPart {
    pub part_number: i64,
    pub etag: String,
}

impl CompletedPart {
    pub fn new(part_number: i64, etag: impl Into<String>) -> Self {
        Self {
            part_number,
            etag: etag.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatus {
    pub is_completed: bool,
    pub total_parts: i64,
    pub completed_parts: i64,
}

impl UploadStatus {
    /// Percentage of declared parts received so far.
    pub fn progress(&self) -> f64 {
        if self.total_parts == 0 {
            return 100.0;
        }
        (self.completed_parts as f64 / self.total_parts as f64) * 100.0
    }
}

/// Tracking state for in-flight chunked uploads.
///
/// All methods are synchronous and must be safe to call concurrently.
/// `complete_upload` fails on an unknown key while `abort_upload` never
/// does, so abort stays usable as cleanup after any failure.
pub trait UploadStore: Send + Sync {
    /// Start tracking `key`. Rejects an empty key, a part count outside
    /// `1..=MAX_PARTS`, and a key that is already tracked.
    fn create_upload(&self, key: &str, upload_id: &str, total_parts: i64) -> Result<()>;

    /// Record a received part. Re-adding a part number replaces its tag.
    /// The part number is not checked against the declared total.
    fn add_part(&self, key: &str, part_number: i64, etag: &str) -> Result<()>;

    /// [`UploadStore::add_part`] that only succeeds while `key` still belongs
    /// to `upload_id`. Fails with `Restarted` once the key was reused.
    fn add_part_for(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i64,
        etag: &str,
    ) -> Result<()>;

    /// Stop tracking `key`. Does not check that every part arrived.
    fn complete_upload(&self, key: &str) -> Result<()>;

    /// Stop tracking `key` if it is tracked. Never fails on a missing key.
    fn abort_upload(&self, key: &str) -> Result<()>;

    /// Stop tracking `key` only while it still belongs to `upload_id`.
    /// Returns whether a record was removed.
    fn remove_if_upload_id(&self, key: &str, upload_id: &str) -> bool;

    fn get_upload_id(&self, key: &str) -> Result<String>;

    /// Parts received so far, in no particular order.
    fn get_parts(&self, key: &str) -> Result<Vec<CompletedPart>>;

    fn get_status(&self, key: &str) -> Result<UploadStatus>;
}

/// Validates the arguments shared by every backend's `create_upload`.
pub fn validate_new_upload(key: &str, total_parts: i64) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument(
            "file uploading key cannot be empty".to_string(),
        ));
    }
    if total_parts <= 0 || total_parts > MAX_PARTS {
        return Err(StoreError::InvalidArgument(format!(
            "total parts must be between 1 and {}, got {}",
            MAX_PARTS, total_parts
        )));
    }
    Ok(())
}
