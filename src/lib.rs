pub mod commands;
pub mod config;
pub mod error;
pub mod library;
pub mod mailer;
pub mod parser;
pub mod pipeline;
pub mod queue;
pub mod transfer;
pub mod watcher;
pub mod worker;

pub use config::{AliasMap, Config, Paths, SmtpConfig};
pub use error::{
    DeletionError, NotificationError, ParseError, PipelineError, ResolutionError, TransferError,
};
pub use mailer::{Mailer, Notifier};
pub use parser::{NameParser, ParsedTorrent};
pub use pipeline::{Outcome, Pipeline};
pub use queue::IngestQueue;
