use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as async_fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::queue::IngestQueue;

const MARKER_EXTENSION: &str = "torrent";

/// Marker filename for `path`, if it names a `.torrent` file.
///
/// Names that aren't valid UTF-8 are skipped: the worker has to find the
/// marker again by name to remove it.
pub fn marker_name(path: &Path) -> Option<String> {
    if path.extension()? != MARKER_EXTENSION {
        return None;
    }
    let file_name = path.file_name()?;
    match file_name.to_str() {
        Some(name) => Some(name.to_string()),
        None => {
            warn!("Skipping marker with non UTF-8 name {:?}", file_name);
            None
        }
    }
}

/// Paths an event announces as newly present in the watched directory.
///
/// inotify follows a rename's `To` event with a `Both` event for the same
/// move, so only `To` counts.
fn announced_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            &event.paths
        }
        _ => &[],
    }
}

/// Feeds marker filenames from the finished directory into the ingest queue
pub struct MarkerWatcher {
    finished_dir: PathBuf,
    queue: Arc<IngestQueue>,
}

impl MarkerWatcher {
    pub fn new(finished_dir: PathBuf, queue: Arc<IngestQueue>) -> Self {
        Self {
            finished_dir,
            queue,
        }
    }

    /// Queue markers that were already present, in name order
    pub async fn scan_backlog(&self) -> Result<usize> {
        let mut names = Vec::new();
        let mut entries = async_fs::read_dir(&self.finished_dir)
            .await
            .with_context(|| format!("Failed to list {:?}", self.finished_dir))?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match marker_name(&entry.path()) {
                Some(name) => names.push(name),
                None => debug!("Ignoring {:?}", entry.path()),
            }
        }

        names.sort();
        let count = names.len();
        for name in names {
            self.queue.push(name);
        }
        info!("Queued {} existing marker(s) from {:?}", count, self.finished_dir);
        Ok(count)
    }

    /// Start pushing newly created markers. Events stop when the returned watcher is dropped.
    pub fn subscribe(&self) -> Result<RecommendedWatcher> {
        let queue = self.queue.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for path in announced_paths(&event) {
                        if let Some(name) = marker_name(path) {
                            info!("New marker {:?}", name);
                            queue.push(name);
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&self.finished_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch path: {:?}", self.finished_dir))?;
        info!("Watching directory: {:?}", self.finished_dir);

        Ok(watcher)
    }

    /// Backlog scan, then live events until cancelled.
    ///
    /// A marker created after the scan lists the directory but before the
    /// subscription is active is not seen until the next start.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        self.scan_backlog().await?;
        let _watcher = self.subscribe()?;
        cancel.cancelled().await;
        info!("File watcher stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[test]
    fn test_marker_name() {
        assert_eq!(
            marker_name(Path::new("/src/finished/Show S01E01.torrent")),
            Some("Show S01E01.torrent".to_string())
        );
        assert_eq!(marker_name(Path::new("/src/finished/Show S01E01.torrent.part")), None);
        assert_eq!(marker_name(Path::new("/src/finished/notes.txt")), None);
        assert_eq!(marker_name(Path::new("/src/finished/torrent")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_marker_name_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"Show \xff S01E01.torrent");
        assert_eq!(marker_name(&Path::new("/src/finished").join(name)), None);
    }

    #[test]
    fn test_announced_paths() {
        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/f/a.torrent"));
        assert_eq!(announced_paths(&create), &[PathBuf::from("/f/a.torrent")]);

        let moved_in = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(PathBuf::from("/f/a.torrent"));
        assert_eq!(announced_paths(&moved_in), &[PathBuf::from("/f/a.torrent")]);

        let moved_out = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(PathBuf::from("/f/a.torrent.tmp"));
        assert!(announced_paths(&moved_out).is_empty());

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/f/a.torrent.tmp"))
            .add_path(PathBuf::from("/f/a.torrent"));
        assert!(announced_paths(&rename).is_empty());

        let remove = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/f/a.torrent"));
        assert!(announced_paths(&remove).is_empty());
    }

    #[tokio::test]
    async fn test_backlog_only_queues_markers() {
        let temp_dir = TempDir::new().unwrap();
        let finished = temp_dir.path();
        fs::write(finished.join("b S01E02.torrent"), "").unwrap();
        fs::write(finished.join("a S01E01.torrent"), "").unwrap();
        fs::write(finished.join("readme.txt"), "").unwrap();
        fs::create_dir(finished.join("dir.torrent")).unwrap();

        let queue = Arc::new(IngestQueue::new());
        let watcher = MarkerWatcher::new(finished.to_path_buf(), queue.clone());
        assert_eq!(watcher.scan_backlog().await.unwrap(), 2);

        assert_eq!(queue.try_pop().as_deref(), Some("a S01E01.torrent"));
        assert_eq!(queue.try_pop().as_deref(), Some("b S01E02.torrent"));
        assert!(queue.is_empty());
        assert!(finished.join("readme.txt").exists());
    }

    #[tokio::test]
    async fn test_backlog_missing_dir() {
        let watcher = MarkerWatcher::new(
            PathBuf::from("/nonexistent/finished"),
            Arc::new(IngestQueue::new()),
        );
        assert!(watcher.scan_backlog().await.is_err());
    }

    #[tokio::test]
    async fn test_live_marker_is_queued() {
        let temp_dir = TempDir::new().unwrap();
        let finished = temp_dir.path().to_path_buf();
        let queue = Arc::new(IngestQueue::new());
        let cancel = CancellationToken::new();

        let watcher = MarkerWatcher::new(finished.clone(), queue.clone());
        let task = tokio::spawn(watcher.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;

        fs::write(finished.join("ignored.txt"), "").unwrap();
        fs::write(finished.join("Show S01E01.torrent"), "").unwrap();

        let popped = timeout(Duration::from_secs(5), queue.pop()).await.unwrap();
        assert_eq!(popped, "Show S01E01.torrent");

        cancel.cancel();
        timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_renamed_marker_is_queued_once() {
        let temp_dir = TempDir::new().unwrap();
        let finished = temp_dir.path().to_path_buf();
        let queue = Arc::new(IngestQueue::new());
        let cancel = CancellationToken::new();

        let watcher = MarkerWatcher::new(finished.clone(), queue.clone());
        let task = tokio::spawn(watcher.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let partial = finished.join("Show S01E01.torrent.part");
        fs::write(&partial, "").unwrap();
        fs::rename(&partial, finished.join("Show S01E01.torrent")).unwrap();

        let popped = timeout(Duration::from_secs(5), queue.pop()).await.unwrap();
        assert_eq!(popped, "Show S01E01.torrent");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(queue.is_empty(), "marker queued again: {:?}", queue.try_pop());

        cancel.cancel();
        timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
