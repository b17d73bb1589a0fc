//! Chunked upload tracking.
//!
//! [`store`] holds the per-upload state and its concurrency contract,
//! [`services::upload_service::UploadService`] drives a chunked upload against
//! an [`services::storage::ObjectStore`] such as S3.

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod services;
pub mod store;
pub mod utils;

pub use error::{Result, UploadError};
pub use services::storage::{Acl, ObjectStore, S3ObjectStore};
pub use services::upload_service::UploadService;
pub use store::{CompletedPart, InMemoryUploadStore, UploadStatus, UploadStore};
