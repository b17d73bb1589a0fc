#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use upload_tracker::services::storage::{Acl, ObjectStore, Result, StorageError, StoredObject};
use upload_tracker::store::CompletedPart;

struct PendingUpload {
    path: String,
    content_type: String,
    parts: HashMap<i64, (String, Bytes)>,
}

#[derive(Default)]
struct State {
    objects: HashMap<String, (Bytes, String)>,
    uploads: HashMap<String, PendingUpload>,
    created: usize,
    uploaded_parts: usize,
    aborted: Vec<String>,
    completed_orders: Vec<Vec<i64>>,
}

/// Object store double that keeps everything in memory and records calls.
#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
    fail_part: Option<i64>,
    fail_abort: bool,
    fail_complete: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_part(mut self, part_number: i64) -> Self {
        self.fail_part = Some(part_number);
        self
    }

    pub fn failing_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    pub fn failing_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.state.lock().objects.get(path).map(|(data, _)| data.clone())
    }

    pub fn open_uploads(&self) -> usize {
        self.state.lock().uploads.len()
    }

    pub fn created(&self) -> usize {
        self.state.lock().created
    }

    pub fn uploaded_parts(&self) -> usize {
        self.state.lock().uploaded_parts
    }

    pub fn aborted(&self) -> Vec<String> {
        self.state.lock().aborted.clone()
    }

    pub fn completed_orders(&self) -> Vec<Vec<i64>> {
        self.state.lock().completed_orders.clone()
    }
}

pub fn etag_for(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        path: &str,
        data: Bytes,
        _acl: Acl,
        content_type: &str,
    ) -> Result<()> {
        self.state
            .lock()
            .objects
            .insert(path.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn get_object(&self, path: &str) -> Result<StoredObject> {
        let state = self.state.lock();
        let (data, content_type) = state
            .objects
            .get(path)
            .ok_or_else(|| StorageError::operation("storage.download", anyhow!("no such key")))?;
        Ok(StoredObject {
            data: data.clone(),
            content_type: Some(content_type.clone()),
        })
    }

    async fn delete_object(&self, path: &str) -> Result<()> {
        self.state.lock().objects.remove(path);
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        path: &str,
        content_type: &str,
        _acl: Acl,
    ) -> Result<String> {
        let upload_id = uuid::Uuid::new_v4().to_string();
        let mut state = self.state.lock();
        state.created += 1;
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                path: path.to_string(),
                content_type: content_type.to_string(),
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn abort_multipart_upload(&self, _path: &str, upload_id: &str) -> Result<()> {
        if self.fail_abort {
            return Err(StorageError::operation(
                "storage.abort_multipart_upload",
                anyhow!("service unavailable"),
            ));
        }
        let mut state = self.state.lock();
        state.uploads.remove(upload_id);
        state.aborted.push(upload_id.to_string());
        Ok(())
    }

    async fn complete_multipart_upload(
        &self,
        path: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        if upload_id.is_empty() {
            return Err(StorageError::MissingUploadId);
        }
        if parts.is_empty() {
            return Err(StorageError::NoCompletedParts);
        }
        if self.fail_complete {
            return Err(StorageError::operation(
                "storage.complete_multipart_upload",
                anyhow!("service unavailable"),
            ));
        }

        let mut state = self.state.lock();
        let order: Vec<i64> = parts.iter().map(|p| p.part_number).collect();
        state.completed_orders.push(order);

        let upload = state.uploads.remove(upload_id).ok_or_else(|| {
            StorageError::operation("storage.complete_multipart_upload", anyhow!("no such upload"))
        })?;
        assert_eq!(upload.path, path);

        let mut body = BytesMut::new();
        for part in &parts {
            let (etag, data) = upload.parts.get(&part.part_number).ok_or_else(|| {
                StorageError::operation(
                    "storage.complete_multipart_upload",
                    anyhow!("missing part {}", part.part_number),
                )
            })?;
            if *etag != part.etag {
                return Err(StorageError::operation(
                    "storage.complete_multipart_upload",
                    anyhow!("etag mismatch for part {}", part.part_number),
                ));
            }
            body.extend_from_slice(data);
        }

        state
            .objects
            .insert(path.to_string(), (body.freeze(), upload.content_type));
        Ok(())
    }

    async fn upload_part(
        &self,
        _path: &str,
        upload_id: &str,
        part_number: i64,
        data: Bytes,
    ) -> Result<CompletedPart> {
        if self.fail_part == Some(part_number) {
            return Err(StorageError::operation(
                "storage.upload_part",
                anyhow!("connection reset"),
            ));
        }

        // Let other part uploads interleave with this one.
        tokio::task::yield_now().await;

        let etag = etag_for(&data);
        let mut state = self.state.lock();
        let upload = state.uploads.get_mut(upload_id).ok_or_else(|| {
            StorageError::operation("storage.upload_part", anyhow!("no such upload"))
        })?;
        upload.parts.insert(part_number, (etag.clone(), data));
        state.uploaded_parts += 1;
        Ok(CompletedPart::new(part_number, etag))
    }

    fn file_url(&self, path: &str) -> String {
        format!("memory://uploads/{}", path)
    }
}
