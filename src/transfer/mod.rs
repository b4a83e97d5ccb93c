//! Moving downloaded content into a show directory.
//!
//! Content is handled by an ordered list of [`TransferStrategy`]s. Each one either
//! doesn't apply, succeeds, or fails; the first success ends the chain and a failure
//! only moves on to the next strategy.

pub mod strategies;

pub use strategies::{ArchiveStrategy, MediaFileStrategy, MediaFolderStrategy};

use async_trait::async_trait;
use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs as async_fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::TransferError;
use crate::mailer::{notify, Notifier};

const BYTES_PER_MB: f64 = 1_048_576.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Copied,
    Extracted,
}

/// Statistics for one successful copy or extraction
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub kind: TransferKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Bytes copied, or the compressed archive size for extractions
    pub bytes: u64,
    pub elapsed: Duration,
}

impl TransferReport {
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / BYTES_PER_MB
    }

    /// MB/s, zero when the transfer took under a millisecond
    pub fn throughput(&self) -> f64 {
        if self.elapsed.as_millis() == 0 {
            return 0.0;
        }
        self.megabytes() / self.elapsed.as_secs_f64()
    }

    /// Notification body for this transfer
    pub fn body(&self) -> String {
        let verb = match self.kind {
            TransferKind::Copied => "copied",
            TransferKind::Extracted => "extracted",
        };
        format!(
            "successfully {verb} {:?} to {:?}\n\n{:.2}MB in {:.2?} ({:.2}MB/s)",
            self.source,
            self.destination,
            self.megabytes(),
            self.elapsed,
            self.throughput()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    Copied(TransferReport),
    Extracted(TransferReport),
    Failed,
}

/// One way of getting content into the destination
#[async_trait]
pub trait TransferStrategy: Send + Sync {
    /// Short label used in logs and failure notifications
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the strategy doesn't apply to `content_path`
    async fn attempt(
        &self,
        content_path: &Path,
        destination: &Path,
    ) -> Result<Option<TransferReport>, TransferError>;
}

/// Runs the transfer strategies in order until one succeeds
pub struct ContentTransfer {
    strategies: Vec<Box<dyn TransferStrategy>>,
    notifier: Arc<dyn Notifier>,
}

impl ContentTransfer {
    pub fn new(strategies: Vec<Box<dyn TransferStrategy>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            strategies,
            notifier,
        }
    }

    /// Folder of media, then single media file, then archive extraction
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            vec![
                Box::new(MediaFolderStrategy::new(config.media_extensions.clone())),
                Box::new(MediaFileStrategy::new(config.media_extensions.clone())),
                Box::new(ArchiveStrategy::new(
                    config.archive_extensions.clone(),
                    config.extract_command.clone(),
                )),
            ],
            notifier,
        )
    }

    pub async fn transfer(
        &self,
        title: &str,
        content_path: &Path,
        destination: &Path,
    ) -> TransferOutcome {
        for strategy in &self.strategies {
            match strategy.attempt(content_path, destination).await {
                Ok(Some(report)) => {
                    info!("{} succeeded for {:?}", strategy.name(), content_path);
                    info!("{}", report.body());
                    return match report.kind {
                        TransferKind::Copied => {
                            notify(&*self.notifier, &format!("{title} Copied"), &report.body())
                                .await;
                            TransferOutcome::Copied(report)
                        }
                        TransferKind::Extracted => {
                            notify(&*self.notifier, &format!("{title} Extracted"), &report.body())
                                .await;
                            TransferOutcome::Extracted(report)
                        }
                    };
                }
                Ok(None) => {
                    info!("{} does not apply to {:?}", strategy.name(), content_path);
                }
                Err(e) => {
                    warn!("{} failed for {:?}: {}", strategy.name(), content_path, e);
                    notify(
                        &*self.notifier,
                        &format!("FAILED {} for {title}", strategy.name()),
                        &e.to_string(),
                    )
                    .await;
                }
            }
        }

        TransferOutcome::Failed
    }
}

/// Case-insensitive extension check against a list of dotless extensions
pub(crate) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Wrap an I/O failure with the path it happened on
pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> TransferError {
    let path = path.to_path_buf();
    move |source| TransferError::Io { path, source }
}

/// Copy `source` into `dest_dir`, keeping its permissions and timestamps
pub(crate) async fn copy_preserving(
    source: &Path,
    dest_dir: &Path,
) -> Result<TransferReport, TransferError> {
    let file_name = source.file_name().ok_or_else(|| TransferError::Io {
        path: source.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
    })?;
    let destination = dest_dir.join(file_name);
    let metadata = async_fs::metadata(source).await.map_err(io_error(source))?;

    info!("copying {:?} to {:?}", source, destination);
    let start = Instant::now();
    let bytes = async_fs::copy(source, &destination)
        .await
        .map_err(io_error(&destination))?;
    let elapsed = start.elapsed();

    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    let target = destination.clone();
    tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .write(true)
            .open(&target)?
            .set_times(times)
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    .and_then(|r| r)
    .map_err(io_error(&destination))?;

    Ok(TransferReport {
        kind: TransferKind::Copied,
        source: source.to_path_buf(),
        destination,
        bytes,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::recording::RecordingNotifier;
    use std::fs;
    use tempfile::TempDir;

    fn config(extract_command: &str) -> Config {
        let mut config = Config::new(crate::config::Paths::new(
            PathBuf::from("/src"),
            PathBuf::from("/tv"),
            None,
        ));
        config.extract_command = extract_command.to_string();
        config
    }

    #[test]
    fn test_report_body() {
        let report = TransferReport {
            kind: TransferKind::Copied,
            source: PathBuf::from("/src/a.mkv"),
            destination: PathBuf::from("/tv/Show/a.mkv"),
            bytes: 3 * 1_048_576,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(report.megabytes(), 3.0);
        assert_eq!(report.throughput(), 1.5);
        let body = report.body();
        assert!(body.contains("successfully copied \"/src/a.mkv\" to \"/tv/Show/a.mkv\""));
        assert!(body.contains("3.00MB"));
        assert!(body.contains("1.50MB/s"));
    }

    #[test]
    fn test_throughput_zero_for_instant_copy() {
        let report = TransferReport {
            kind: TransferKind::Extracted,
            source: PathBuf::from("a.rar"),
            destination: PathBuf::from("/tv"),
            bytes: 1_048_576,
            elapsed: Duration::from_micros(300),
        };
        assert_eq!(report.throughput(), 0.0);
        assert!(report.body().starts_with("successfully extracted"));
    }

    #[test]
    fn test_has_extension() {
        let exts = vec!["mkv".to_string()];
        assert!(has_extension(Path::new("a/b.MKV"), &exts));
        assert!(!has_extension(Path::new("a/b.mkv.part"), &exts));
        assert!(!has_extension(Path::new("a/mkv"), &exts));
    }

    #[tokio::test]
    async fn test_copy_preserves_modified_time() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("episode.mkv");
        let dest_dir = temp_dir.path().join("Show");
        fs::write(&source, "video bytes").unwrap();
        fs::create_dir(&dest_dir).unwrap();

        let report = copy_preserving(&source, &dest_dir).await.unwrap();

        assert_eq!(report.bytes, 11);
        assert_eq!(report.destination, dest_dir.join("episode.mkv"));
        assert_eq!(
            fs::metadata(&source).unwrap().modified().unwrap(),
            fs::metadata(&report.destination).unwrap().modified().unwrap()
        );
    }

    #[tokio::test]
    async fn test_media_folder_wins_over_archive() {
        let temp_dir = TempDir::new().unwrap();
        let content = temp_dir.path().join("Show.S01E01.720p");
        let dest = temp_dir.path().join("Show");
        fs::create_dir_all(content.join("Sample")).unwrap();
        fs::create_dir(&dest).unwrap();
        fs::write(content.join("show.s01e01.mkv"), "video").unwrap();
        fs::write(content.join("show.s01e01.rar"), "archive").unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        // extraction would fail loudly if it were ever reached
        let transfer = ContentTransfer::from_config(&config("false"), notifier.clone());
        let outcome = transfer.transfer("Show", &content, &dest).await;

        assert!(matches!(outcome, TransferOutcome::Copied(_)));
        assert!(dest.join("show.s01e01.mkv").exists());
        assert_eq!(notifier.subjects(), vec!["Show Copied".to_string()]);
    }

    #[tokio::test]
    async fn test_single_file_gets_extension_appended() {
        let temp_dir = TempDir::new().unwrap();
        let content = temp_dir.path().join("Show.S01E02.x265-GRP");
        let dest = temp_dir.path().join("Show");
        fs::create_dir(&dest).unwrap();
        fs::write(temp_dir.path().join("Show.S01E02.x265-GRP.mkv"), "video").unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let transfer = ContentTransfer::from_config(&config("false"), notifier.clone());
        let outcome = transfer.transfer("Show", &content, &dest).await;

        assert!(matches!(outcome, TransferOutcome::Copied(_)));
        assert!(dest.join("Show.S01E02.x265-GRP.mkv").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_archive_extraction() {
        let temp_dir = TempDir::new().unwrap();
        let content = temp_dir.path().join("Show.S01E03");
        let dest = temp_dir.path().join("Show");
        fs::create_dir(&content).unwrap();
        fs::create_dir(&dest).unwrap();
        fs::write(content.join("show.s01e03.rar"), "archive").unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let transfer = ContentTransfer::from_config(&config("true"), notifier.clone());
        let outcome = transfer.transfer("Show", &content, &dest).await;

        match outcome {
            TransferOutcome::Extracted(report) => {
                assert_eq!(report.bytes, 7);
                assert_eq!(report.source, content.join("show.s01e03.rar"));
            }
            other => panic!("expected extraction, got {other:?}"),
        }
        assert_eq!(notifier.subjects(), vec!["Show Extracted".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_extraction_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let content = temp_dir.path().join("Show.S01E04");
        let dest = temp_dir.path().join("Show");
        fs::create_dir(&content).unwrap();
        fs::create_dir(&dest).unwrap();
        fs::write(content.join("show.s01e04.rar"), "archive").unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let transfer = ContentTransfer::from_config(&config("false"), notifier.clone());
        let outcome = transfer.transfer("Show", &content, &dest).await;

        assert_eq!(outcome, TransferOutcome::Failed);
        assert_eq!(
            notifier.subjects(),
            vec!["FAILED archive extraction for Show".to_string()]
        );
    }

    #[tokio::test]
    async fn test_nothing_to_transfer() {
        let temp_dir = TempDir::new().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let transfer = ContentTransfer::from_config(&config("false"), notifier.clone());

        let outcome = transfer
            .transfer("Show", &temp_dir.path().join("missing"), temp_dir.path())
            .await;

        assert_eq!(outcome, TransferOutcome::Failed);
        assert!(notifier.subjects().is_empty());
    }
}
