use crate::error::{Result, UploadError};
use crate::services::upload_service::UploadService;
use crate::store::{InMemoryUploadStore, UploadStore};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Periodically aborts uploads that were started but never finished.
pub struct StaleUploadSweeper {
    store: Arc<InMemoryUploadStore>,
    service: Arc<UploadService>,
    stale_after: chrono::Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StaleUploadSweeper {
    /// Both durations must be non-zero: a zero age would treat every
    /// upload as stale.
    pub fn new(
        store: Arc<InMemoryUploadStore>,
        service: Arc<UploadService>,
        stale_after: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        if stale_after.is_zero() {
            return Err(UploadError::InvalidArgument(
                "stale upload age must be greater than zero".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(UploadError::InvalidArgument(
                "sweep interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            store,
            service,
            stale_after: chrono::Duration::from_std(stale_after)
                .unwrap_or(chrono::Duration::MAX),
            interval,
            shutdown,
        })
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Stale upload sweeper started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Stale upload sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep().await;
                }
            }
        }
    }

    /// Runs one sweep and returns the number of uploads dropped.
    pub async fn sweep(&self) -> usize {
        let stale = self.store.stale_uploads(self.stale_after);
        if stale.is_empty() {
            return 0;
        }

        let found = stale.len();
        let store = self.store.clone();
        let aborted = self
            .service
            .abort_stale(stale, |upload| {
                store.remove_if_upload_id(&upload.key, &upload.upload_id)
            })
            .await;

        tracing::info!(found = found, aborted = aborted, "🧹 Swept stale uploads");
        found
    }
}
