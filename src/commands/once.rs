use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use super::{build_pipeline, check_paths};
use crate::config::Config;
use crate::queue::IngestQueue;
use crate::watcher::MarkerWatcher;
use crate::worker::Worker;

/// Process the markers already in the finished directory, then exit
pub struct OnceCommand {
    config: Config,
}

impl OnceCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Per-marker failures are mailed, never returned
    pub async fn execute(self) -> Result<usize> {
        check_paths(&self.config.paths)?;
        let finished_dir = self.config.paths.finished_dir.clone();

        let queue = Arc::new(IngestQueue::new());
        MarkerWatcher::new(finished_dir.clone(), queue.clone())
            .scan_backlog()
            .await?;

        let worker = Worker::new(queue, build_pipeline(self.config)?, finished_dir);
        let processed = worker.drain().await;

        info!("✅ Processed {} marker(s).", processed);
        Ok(processed)
    }
}
