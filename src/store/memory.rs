use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use super::{
    CompletedPart, Result, StoreError, UploadStatus, UploadStore, validate_new_upload,
};

struct UploadRecord {
    upload_id: String,
    total_parts: i64,
    parts: HashMap<i64, String>,
    created_at: DateTime<Utc>,
}

impl UploadRecord {
    fn status(&self) -> UploadStatus {
        let completed_parts = self.parts.len() as i64;
        UploadStatus {
            is_completed: completed_parts == self.total_parts,
            total_parts: self.total_parts,
            completed_parts,
        }
    }
}

/// An upload that has been tracked for longer than a cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleUpload {
    pub key: String,
    pub upload_id: String,
    pub created_at: DateTime<Utc>,
}

/// Process-local [`UploadStore`].
///
/// One read/write lock guards the whole map. Readers share it; every write
/// holds it exclusively for the duration of a single map mutation.
#[derive(Default)]
pub struct InMemoryUploadStore {
    records: RwLock<HashMap<String, UploadRecord>>,
}

impl InMemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads currently tracked.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Uploads created more than `older_than` ago.
    ///
    /// Nothing is removed here; callers abort the remote upload first and
    /// then call `remove_if_upload_id`.
    pub fn stale_uploads(&self, older_than: Duration) -> Vec<StaleUpload> {
        let Some(cutoff) = Utc::now().checked_sub_signed(older_than) else {
            return Vec::new();
        };
        self.records
            .read()
            .iter()
            .filter(|(_, record)| record.created_at < cutoff)
            .map(|(key, record)| StaleUpload {
                key: key.clone(),
                upload_id: record.upload_id.clone(),
                created_at: record.created_at,
            })
            .collect()
    }
}

impl UploadStore for InMemoryUploadStore {
    fn create_upload(&self, key: &str, upload_id: &str, total_parts: i64) -> Result<()> {
        validate_new_upload(key, total_parts)?;

        let mut records = self.records.write();
        if records.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }

        records.insert(
            key.to_string(),
            UploadRecord {
                upload_id: upload_id.to_string(),
                total_parts,
                parts: HashMap::new(),
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    fn add_part(&self, key: &str, part_number: i64, etag: &str) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        record.parts.insert(part_number, etag.to_string());
        Ok(())
    }

    fn add_part_for(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i64,
        etag: &str,
    ) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if record.upload_id != upload_id {
            return Err(StoreError::Restarted(key.to_string()));
        }

        record.parts.insert(part_number, etag.to_string());
        Ok(())
    }

    fn complete_upload(&self, key: &str) -> Result<()> {
        self.records
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn abort_upload(&self, key: &str) -> Result<()> {
        self.records.write().remove(key);
        Ok(())
    }

    fn remove_if_upload_id(&self, key: &str, upload_id: &str) -> bool {
        let mut records = self.records.write();
        let owned = records
            .get(key)
            .is_some_and(|record| record.upload_id == upload_id);
        if owned {
            records.remove(key);
        }
        owned
    }

    fn get_upload_id(&self, key: &str) -> Result<String> {
        self.records
            .read()
            .get(key)
            .map(|record| record.upload_id.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn get_parts(&self, key: &str) -> Result<Vec<CompletedPart>> {
        let records = self.records.read();
        let record = records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        Ok(record
            .parts
            .iter()
            .map(|(number, etag)| CompletedPart::new(*number, etag.clone()))
            .collect())
    }

    fn get_status(&self, key: &str) -> Result<UploadStatus> {
        self.records
            .read()
            .get(key)
            .map(UploadRecord::status)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
