use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::{info, warn};

use crate::error::DeletionError;

/// Removes older copies of an episode before a new one is filed
#[derive(Debug, Clone, Default)]
pub struct StaleFileCleaner;

impl StaleFileCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Delete every entry directly inside `destination` whose name contains
    /// `episode` (case-insensitive). Each deletion succeeds or fails on its own.
    ///
    /// Fails only when the destination itself can't be listed.
    pub async fn clean(
        &self,
        destination: &Path,
        episode: &str,
    ) -> std::io::Result<Vec<Result<PathBuf, DeletionError>>> {
        let token = episode.to_lowercase();
        let mut stale = Vec::new();

        let mut entries = async_fs::read_dir(destination).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .contains(&token)
            {
                stale.push(entry.path());
            }
        }
        stale.sort();

        let mut results = Vec::with_capacity(stale.len());
        for path in stale {
            match async_fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Removed stale {:?}", path);
                    results.push(Ok(path));
                }
                Err(source) => {
                    warn!("Unable to remove stale {:?}: {}", path, source);
                    results.push(Err(DeletionError { path, source }));
                }
            }
        }

        Ok(results)
    }
}
