use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs as async_fs;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::mailer::notify;
use crate::pipeline::{Outcome, Pipeline};
use crate::queue::IngestQueue;

/// Sequential consumer of the ingest queue
pub struct Worker {
    queue: Arc<IngestQueue>,
    pipeline: Arc<Pipeline>,
    finished_dir: PathBuf,
}

impl Worker {
    pub fn new(queue: Arc<IngestQueue>, pipeline: Arc<Pipeline>, finished_dir: PathBuf) -> Self {
        Self {
            queue,
            pipeline,
            finished_dir,
        }
    }

    /// Process queued markers one at a time until cancelled. Per-item failures never end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("✅ Worker started, waiting for markers");
        loop {
            let marker_name = tokio::select! {
                _ = cancel.cancelled() => break,
                name = self.queue.pop() => name,
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("🛑 Cancelled while processing {:?}, partial files may remain", marker_name);
                    break;
                }
                _ = self.process_one(&marker_name) => {}
            }
        }
        info!("Worker stopped");
    }

    /// Process everything queued right now, then return
    pub async fn drain(&self) -> usize {
        let mut processed = 0;
        while let Some(marker_name) = self.queue.try_pop() {
            self.process_one(&marker_name).await;
            processed += 1;
        }
        processed
    }

    /// Remove the marker, then run the pipeline for it in its own task so that
    /// even a panic is reported rather than taking the worker down.
    pub async fn process_one(&self, marker_name: &str) {
        let marker_path = self.finished_dir.join(marker_name);
        match async_fs::remove_file(&marker_path).await {
            Ok(()) => debug!("Removed marker {:?}", marker_path),
            Err(e) => warn!("Unable to remove marker {:?}: {}", marker_path, e),
        }

        let pipeline = self.pipeline.clone();
        let name = marker_name.to_string();
        let task = tokio::spawn(async move { pipeline.process(&name).await });
        let _abort = AbortOnDrop(task.abort_handle());

        let failure = match task.await {
            Ok(Ok(Outcome::Delivered { title, .. })) => {
                info!("➡️ Finished {:?} ({})", marker_name, title);
                None
            }
            Ok(Ok(Outcome::Failed(e))) => {
                info!("Finished {:?} with reported failure: {}", marker_name, e);
                None
            }
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(e) if e.is_panic() => Some(format!("panic while processing: {e}")),
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = failure {
            error!("❌ Processing {:?} FAILED: {}", marker_name, reason);
            notify(
                self.pipeline.notifier(),
                &format!("FAILED Processing {marker_name}"),
                &reason,
            )
            .await;
        }
    }
}

/// Aborts the pipeline task if processing is cancelled mid-flight
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
