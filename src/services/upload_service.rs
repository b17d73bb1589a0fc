use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::services::storage::{Acl, ObjectStore, sort_parts};
use crate::store::{CompletedPart, StaleUpload, StoreError, UploadStatus, UploadStore};
use crate::utils::validation::{
    total_parts_for, validate_part_number, validate_total_parts, validate_upload_key,
};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use std::path::Path;
use std::sync::Arc;

/// Drives chunked uploads against an [`ObjectStore`], keeping progress in an
/// [`UploadStore`].
///
/// The store lock is never held across a call to the object store.
pub struct UploadService {
    store: Arc<dyn UploadStore>,
    storage: Arc<dyn ObjectStore>,
    config: UploadConfig,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn UploadStore>,
        storage: Arc<dyn ObjectStore>,
        config: UploadConfig,
    ) -> Self {
        Self {
            store,
            storage,
            config,
        }
    }

    /// Starts a chunked upload for `key` and begins tracking it.
    pub async fn init_upload(
        &self,
        key: &str,
        content_type: &str,
        acl: Acl,
        total_parts: i64,
    ) -> Result<String> {
        validate_upload_key(key)?;
        validate_total_parts(total_parts)?;

        let upload_id = self
            .storage
            .create_multipart_upload(key, content_type, acl)
            .await?;

        if let Err(e) = self.store.create_upload(key, &upload_id, total_parts) {
            // Only the remote session is ours to clean up; on AlreadyExists
            // the tracked record belongs to another upload.
            if let Err(abort_err) = self.storage.abort_multipart_upload(key, &upload_id).await {
                tracing::warn!(
                    key = %key,
                    upload_id = %upload_id,
                    error = %abort_err,
                    "Failed to abort orphaned multipart upload"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            key = %key,
            upload_id = %upload_id,
            total_parts = total_parts,
            "Started chunked upload"
        );

        Ok(upload_id)
    }

    /// Uploads one part and records its integrity tag.
    pub async fn upload_chunk(
        &self,
        key: &str,
        part_number: i64,
        data: Bytes,
    ) -> Result<UploadStatus> {
        let upload_id = self.store.get_upload_id(key)?;
        let status = self.store.get_status(key)?;
        validate_part_number(part_number, status.total_parts)?;

        let size = data.len();
        let part = self
            .storage
            .upload_part(key, &upload_id, part_number, data)
            .await?;
        // The key may have been aborted and restarted while the part was in
        // flight; its tag belongs to the old session only.
        self.store
            .add_part_for(key, &upload_id, part.part_number, &part.etag)?;

        let status = self.store.get_status(key)?;
        tracing::debug!(
            key = %key,
            part_number = part_number,
            size = size,
            received = status.completed_parts,
            total = status.total_parts,
            progress = status.progress(),
            "Stored upload part"
        );

        Ok(status)
    }

    /// Finalizes the upload once every declared part has been received.
    ///
    /// On failure the tracking record is kept so the caller can retry or
    /// abort.
    pub async fn complete_upload(&self, key: &str) -> Result<()> {
        let status = self.store.get_status(key)?;
        if !status.is_completed {
            return Err(UploadError::IncompleteUpload {
                expected: status.total_parts,
                received: status.completed_parts,
            });
        }

        let upload_id = self.store.get_upload_id(key)?;
        let mut parts = self.store.get_parts(key)?;
        sort_parts(&mut parts);

        self.storage
            .complete_multipart_upload(key, &upload_id, parts)
            .await?;
        if !self.store.remove_if_upload_id(key, &upload_id) {
            tracing::warn!(
                key = %key,
                upload_id = %upload_id,
                "Upload record was replaced before completion was recorded"
            );
        }

        tracing::info!(key = %key, upload_id = %upload_id, "Completed chunked upload");
        Ok(())
    }

    /// Aborts the remote upload, if one is tracked, and drops the record.
    ///
    /// Succeeds on unknown keys. The record is removed even when the remote
    /// abort fails; that failure is still returned. A record started under
    /// the same key while the remote abort was running is left alone.
    pub async fn abort_upload(&self, key: &str) -> Result<()> {
        let upload_id = match self.store.get_upload_id(key) {
            Ok(id) => id,
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let remote = self.storage.abort_multipart_upload(key, &upload_id).await;
        self.store.remove_if_upload_id(key, &upload_id);
        remote?;

        tracing::info!(key = %key, upload_id = %upload_id, "Aborted chunked upload");
        Ok(())
    }

    pub fn status(&self, key: &str) -> Result<UploadStatus> {
        Ok(self.store.get_status(key)?)
    }

    /// Received parts, ordered by part number.
    pub fn parts(&self, key: &str) -> Result<Vec<CompletedPart>> {
        let mut parts = self.store.get_parts(key)?;
        sort_parts(&mut parts);
        Ok(parts)
    }

    /// Uploads a whole buffer as a chunked upload and returns its public URL.
    ///
    /// Parts are pushed concurrently; any failure aborts the upload on both
    /// sides and the original error is returned.
    pub async fn upload_file(
        &self,
        data: Bytes,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String> {
        let part_size = self.config.part_size;
        let total_parts = total_parts_for(data.len() as u64, part_size)?;
        self.init_upload(key, content_type, acl, total_parts).await?;

        let result = self.push_parts(&data, key, part_size, total_parts).await;
        let result = match result {
            Ok(()) => self.complete_upload(key).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!(key = %key, error = %e, "Chunked upload failed, aborting");
            if let Err(cleanup_err) = self.abort_upload(key).await {
                tracing::warn!(
                    key = %key,
                    error = %cleanup_err,
                    "Cleanup after failed upload did not finish"
                );
            }
            return Err(e);
        }

        Ok(self.storage.file_url(key))
    }

    /// Reads a local file and uploads it with [`UploadService::upload_file`].
    pub async fn upload_path(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String> {
        let data = tokio::fs::read(path).await?;
        tracing::info!(
            path = %path.display(),
            key = %key,
            size = data.len(),
            part_size = self.config.part_size,
            "📦 Uploading file"
        );
        self.upload_file(Bytes::from(data), key, content_type, acl)
            .await
    }

    async fn push_parts(
        &self,
        data: &Bytes,
        key: &str,
        part_size: usize,
        total_parts: i64,
    ) -> Result<()> {
        stream::iter(1..=total_parts)
            .map(|part_number| {
                let start = (part_number as usize - 1) * part_size;
                let end = (start + part_size).min(data.len());
                self.upload_chunk(key, part_number, data.slice(start..end))
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .try_for_each(|_| async { Ok(()) })
            .await
    }

    /// Aborts uploads reported stale by the store's housekeeping.
    ///
    /// Returns how many were aborted remotely without error.
    pub async fn abort_stale(
        &self,
        stale: Vec<StaleUpload>,
        remove: impl Fn(&StaleUpload) -> bool,
    ) -> usize {
        let mut aborted = 0;
        for upload in stale {
            match self
                .storage
                .abort_multipart_upload(&upload.key, &upload.upload_id)
                .await
            {
                Ok(()) => aborted += 1,
                Err(e) => tracing::warn!(
                    key = %upload.key,
                    upload_id = %upload.upload_id,
                    error = %e,
                    "Failed to abort stale upload"
                ),
            }
            if remove(&upload) {
                tracing::debug!(key = %upload.key, "Dropped stale upload record");
            }
        }
        aborted
    }
}
