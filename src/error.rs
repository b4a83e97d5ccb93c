use std::path::PathBuf;
use thiserror::Error;

/// A marker filename that could not be broken into title, episode and content path
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("ERROR: match is none for \"{0}\"")]
    NoMatch(String),
    #[error("ERROR: incomplete match for \"{0}\"")]
    IncompleteMatch(String),
}

/// No usable show directory for a normalized title
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Unable to find sufficient match for \"{title}\" in {root:?}")]
    NoMatch { title: String, root: PathBuf },
    #[error("Destination not folder: {0:?}")]
    NotADirectory(PathBuf),
    #[error("Unable to list library root {root:?}: {source}")]
    Listing {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to remove one stale episode file. Never aborts sibling deletions.
#[derive(Debug, Error)]
#[error("Failed to remove {path:?}: {source}")]
pub struct DeletionError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} failed on {archive:?} ({status}): {stderr}")]
    Extraction {
        command: String,
        archive: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("No transfer strategy applied to {0:?}")]
    NoStrategy(PathBuf),
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Failures that end processing of one marker file and are reported by mail
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}
