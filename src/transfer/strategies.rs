use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::fs as async_fs;
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{copy_preserving, has_extension, io_error, TransferKind, TransferReport, TransferStrategy};
use crate::error::TransferError;

/// First file under `dir` (recursively, in name order) with one of `extensions`
fn find_first_with_extension(dir: &Path, extensions: &[String]) -> Option<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Unable to read entry under {:?}: {}", dir, e);
                None
            }
        })
        .find(|entry| entry.file_type().is_file() && has_extension(entry.path(), extensions))
        .map(|entry| entry.into_path())
}

/// Download is a directory holding the episode, e.g. alongside samples and nfo files
#[derive(Debug, Clone)]
pub struct MediaFolderStrategy {
    extensions: Vec<String>,
}

impl MediaFolderStrategy {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }
}

#[async_trait]
impl TransferStrategy for MediaFolderStrategy {
    fn name(&self) -> &'static str {
        "folder copy"
    }

    async fn attempt(
        &self,
        content_path: &Path,
        destination: &Path,
    ) -> Result<Option<TransferReport>, TransferError> {
        if !content_path.is_dir() {
            debug!("torrent path not dir {:?}", content_path);
            return Ok(None);
        }

        match find_first_with_extension(content_path, &self.extensions) {
            Some(media) => copy_preserving(&media, destination).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Download is the media file itself, named after the torrent with or without its extension
#[derive(Debug, Clone)]
pub struct MediaFileStrategy {
    extensions: Vec<String>,
}

impl MediaFileStrategy {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Paths the media file might live at. Extensions are appended rather than
    /// substituted since release names are full of dots.
    fn candidates(&self, content_path: &Path) -> Vec<PathBuf> {
        if has_extension(content_path, &self.extensions) {
            return vec![content_path.to_path_buf()];
        }

        self.extensions
            .iter()
            .map(|ext| {
                let mut name = OsString::from(content_path.as_os_str());
                name.push(".");
                name.push(ext);
                PathBuf::from(name)
            })
            .collect()
    }
}

#[async_trait]
impl TransferStrategy for MediaFileStrategy {
    fn name(&self) -> &'static str {
        "file copy"
    }

    async fn attempt(
        &self,
        content_path: &Path,
        destination: &Path,
    ) -> Result<Option<TransferReport>, TransferError> {
        for candidate in self.candidates(content_path) {
            if candidate.is_file() {
                return copy_preserving(&candidate, destination).await.map(Some);
            }
            debug!("{:?} does not exist", candidate);
        }
        Ok(None)
    }
}

/// Download is a directory with a packed release, unpacked by an external tool
#[derive(Debug, Clone)]
pub struct ArchiveStrategy {
    extensions: Vec<String>,
    command: String,
}

impl ArchiveStrategy {
    pub fn new(extensions: Vec<String>, command: String) -> Self {
        Self {
            extensions,
            command,
        }
    }
}

#[async_trait]
impl TransferStrategy for ArchiveStrategy {
    fn name(&self) -> &'static str {
        "archive extraction"
    }

    async fn attempt(
        &self,
        content_path: &Path,
        destination: &Path,
    ) -> Result<Option<TransferReport>, TransferError> {
        if !content_path.is_dir() {
            return Ok(None);
        }
        let Some(archive) = find_first_with_extension(content_path, &self.extensions) else {
            return Ok(None);
        };

        // Compressed size: the report's throughput is an approximation for archives
        let bytes = async_fs::metadata(&archive)
            .await
            .map_err(io_error(&archive))?
            .len();

        // unrar only treats the target as a directory with a trailing separator
        let mut target = OsString::from(destination.as_os_str());
        target.push("/");

        info!("extracting {:?} to {:?} with {}", archive, destination, self.command);
        let start = Instant::now();
        let output = Command::new(&self.command)
            .arg("x")
            .arg("-o+")
            .arg("-y")
            .arg(&archive)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| TransferError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        let elapsed = start.elapsed();

        if !output.status.success() {
            return Err(TransferError::Extraction {
                command: self.command.clone(),
                archive,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(Some(TransferReport {
            kind: TransferKind::Extracted,
            source: archive,
            destination: destination.to_path_buf(),
            bytes,
            elapsed,
        }))
    }
}
