use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{build_pipeline, check_paths};
use crate::config::Config;
use crate::queue::IngestQueue;
use crate::watcher::MarkerWatcher;
use crate::worker::Worker;

/// Long-running form: watch for finished downloads until interrupted
pub struct WatchCommand {
    config: Config,
}

impl WatchCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(self) -> Result<()> {
        check_paths(&self.config.paths)?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match signal::ctrl_c().await {
                    Ok(()) => info!("🛑 Shutdown signal received. Exiting gracefully."),
                    Err(e) => error!("Unable to listen for shutdown signal: {}", e),
                }
                cancel.cancel();
            }
        });

        self.run(cancel).await
    }

    /// Run watcher and worker until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let finished_dir = self.config.paths.finished_dir.clone();
        let queue = Arc::new(IngestQueue::new());
        let pipeline = build_pipeline(self.config)?;

        let watcher = MarkerWatcher::new(finished_dir.clone(), queue.clone());
        let worker = Worker::new(queue, pipeline, finished_dir);

        let watcher_task = tokio::spawn(watcher.run(cancel.clone()));
        let worker_task = tokio::spawn({
            let cancel = cancel.clone();
            async move { worker.run(cancel).await }
        });

        // A watcher that can't start takes the worker down with it
        let watched = watcher_task.await.context("watcher task failed");
        if !cancel.is_cancelled() {
            cancel.cancel();
        }
        worker_task.await.context("worker task failed")?;
        watched?
    }
}
