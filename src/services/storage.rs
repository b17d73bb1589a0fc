use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{self, CompletedMultipartUpload, ObjectCannedAcl};
use bytes::Bytes;
use thiserror::Error;

use crate::store::{CompletedPart, MAX_PARTS};

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object path cannot be empty")]
    EmptyPath,

    #[error("upload id is missed or empty")]
    MissingUploadId,

    #[error("no completed parts, nothing to upload")]
    NoCompletedParts,

    #[error("part number must be between 1 and {max}, got {part_number}")]
    InvalidPartNumber { part_number: i64, max: i64 },

    #[error("{op}: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl StorageError {
    /// Tags a backend failure with the operation that produced it.
    pub fn operation(op: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Operation {
            op,
            source: source.into(),
        }
    }
}

/// Canned access control applied to stored objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acl {
    Public,
    #[default]
    Private,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Public => "public-read",
            Acl::Private => "private",
        }
    }
}

impl std::fmt::Display for Acl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Acl> for ObjectCannedAcl {
    fn from(acl: Acl) -> Self {
        match acl {
            Acl::Public => ObjectCannedAcl::PublicRead,
            Acl::Private => ObjectCannedAcl::Private,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Remote object storage capable of chunked uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, path: &str, data: Bytes, acl: Acl, content_type: &str)
    -> Result<()>;
    async fn get_object(&self, path: &str) -> Result<StoredObject>;
    async fn delete_object(&self, path: &str) -> Result<()>;

    /// Starts a chunked upload and returns its session id.
    async fn create_multipart_upload(
        &self,
        path: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String>;
    async fn abort_multipart_upload(&self, path: &str, upload_id: &str) -> Result<()>;

    /// Finalizes a chunked upload. Parts are sent in ascending part order.
    async fn complete_multipart_upload(
        &self,
        path: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()>;

    /// Uploads one 1-based part and returns its integrity tag.
    async fn upload_part(
        &self,
        path: &str,
        upload_id: &str,
        part_number: i64,
        data: Bytes,
    ) -> Result<CompletedPart>;

    /// Public URL of a stored object.
    fn file_url(&self, path: &str) -> String;
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(StorageError::EmptyPath);
    }
    Ok(())
}

fn check_upload_id(upload_id: &str) -> Result<()> {
    if upload_id.is_empty() {
        return Err(StorageError::MissingUploadId);
    }
    Ok(())
}

fn sdk_part_number(part_number: i64) -> Result<i32> {
    if !(1..=MAX_PARTS).contains(&part_number) {
        return Err(StorageError::InvalidPartNumber {
            part_number,
            max: MAX_PARTS,
        });
    }
    // Bounded by MAX_PARTS above.
    Ok(part_number as i32)
}

/// S3 returns ETags wrapped in double quotes.
fn normalize_etag(etag: &str) -> &str {
    etag.trim_matches('"')
}

fn created_upload_id(upload_id: Option<&str>) -> Result<String> {
    match upload_id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(StorageError::MissingUploadId),
    }
}

/// Sorts parts by part number, as chunks may have arrived in any order.
pub fn sort_parts(parts: &mut [CompletedPart]) {
    parts.sort_by_key(|p| p.part_number);
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    url: String,
    force_path_style: bool,
}

impl S3ObjectStore {
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        url: impl Into<String>,
        force_path_style: bool,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            url: url.into(),
            force_path_style,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        path: &str,
        data: Bytes,
        acl: Acl,
        content_type: &str,
    ) -> Result<()> {
        check_path(path)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data))
            .acl(acl.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.upload", e))?;
        Ok(())
    }

    async fn get_object(&self, path: &str) -> Result<StoredObject> {
        check_path(path)?;

        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.download", e))?;

        let content_type = res.content_type().map(str::to_string);
        let data = res
            .body
            .collect()
            .await
            .map_err(|e| StorageError::operation("storage.download", e))?
            .into_bytes();

        Ok(StoredObject { data, content_type })
    }

    async fn delete_object(&self, path: &str) -> Result<()> {
        check_path(path)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.remove", e))?;
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        path: &str,
        content_type: &str,
        acl: Acl,
    ) -> Result<String> {
        check_path(path)?;

        let res = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .acl(acl.into())
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.create_multipart_upload", e))?;

        created_upload_id(res.upload_id())
    }

    async fn abort_multipart_upload(&self, path: &str, upload_id: &str) -> Result<()> {
        check_upload_id(upload_id)?;
        check_path(path)?;

        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.abort_multipart_upload", e))?;
        Ok(())
    }

    async fn complete_multipart_upload(
        &self,
        path: &str,
        upload_id: &str,
        mut parts: Vec<CompletedPart>,
    ) -> Result<()> {
        check_upload_id(upload_id)?;
        if parts.is_empty() {
            return Err(StorageError::NoCompletedParts);
        }
        check_path(path)?;

        sort_parts(&mut parts);
        let completed = parts
            .into_iter()
            .map(|p| -> Result<types::CompletedPart> {
                Ok(types::CompletedPart::builder()
                    .e_tag(p.etag)
                    .part_number(sdk_part_number(p.part_number)?)
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .upload_id(upload_id)
            .multipart_upload(multipart_upload)
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.complete_multipart_upload", e))?;
        Ok(())
    }

    async fn upload_part(
        &self,
        path: &str,
        upload_id: &str,
        part_number: i64,
        data: Bytes,
    ) -> Result<CompletedPart> {
        check_upload_id(upload_id)?;
        let sdk_number = sdk_part_number(part_number)?;
        check_path(path)?;

        let res = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(path)
            .upload_id(upload_id)
            .part_number(sdk_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::operation("storage.upload_part", e))?;

        let etag = normalize_etag(res.e_tag().unwrap_or_default());
        Ok(CompletedPart::new(part_number, etag))
    }

    fn file_url(&self, path: &str) -> String {
        if self.force_path_style {
            format!("{}/{}/{}", self.url, self.bucket, path)
        } else {
            format!("{}/{}", self.url, path)
        }
    }
}
