use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{PipelineError, TransferError};
use crate::library::{normalize_title, DestinationResolver, StaleFileCleaner};
use crate::mailer::{notify, Notifier};
use crate::parser::{NameParser, ParsedTorrent};
use crate::transfer::{ContentTransfer, TransferOutcome, TransferReport};

/// How processing one marker ended
#[derive(Debug)]
pub enum Outcome {
    Delivered {
        title: String,
        destination: PathBuf,
        report: TransferReport,
    },
    /// Stopped early; the failure has already been mailed
    Failed(PipelineError),
}

/// Parse → resolve → clean → transfer for a single marker filename
pub struct Pipeline {
    config: Arc<Config>,
    parser: NameParser,
    resolver: DestinationResolver,
    cleaner: StaleFileCleaner,
    transfer: ContentTransfer,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, notifier: Arc<dyn Notifier>) -> Result<Self> {
        Ok(Self {
            parser: NameParser::new()?,
            resolver: DestinationResolver::new(config.paths.dest_root.clone()),
            cleaner: StaleFileCleaner::new(),
            transfer: ContentTransfer::from_config(&config, notifier.clone()),
            notifier,
            config,
        })
    }

    pub fn notifier(&self) -> &dyn Notifier {
        &*self.notifier
    }

    /// Failures that only concern this marker are mailed and returned as
    /// [`Outcome::Failed`]; anything else comes back as an error.
    pub async fn process(&self, marker_name: &str) -> Result<Outcome> {
        info!("*** STARTING {:?} ***", marker_name);

        let ParsedTorrent {
            title,
            episode,
            content_path,
        } = match self.parser.parse(marker_name) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("{}", e);
                self.report(&format!("FAILED Copying {marker_name}"), &e.to_string())
                    .await;
                return Ok(Outcome::Failed(e.into()));
            }
        };
        info!("name is {:?}, episode {:?}, path {:?}", title, episode, content_path);

        let title = normalize_title(&title, &self.config.aliases);
        info!("name prefix is {:?}", title);

        let destination = match self.resolver.resolve(&title).await {
            Ok(destination) => destination,
            Err(e) => {
                error!("{}", e);
                self.report(&format!("FAILED Copying {title}"), &e.to_string())
                    .await;
                return Ok(Outcome::Failed(e.into()));
            }
        };

        for removal in self.cleaner.clean(&destination, &episode).await? {
            match removal {
                Ok(path) => {
                    self.report(&format!("{title} Removed"), &format!("removed stale {path:?}"))
                        .await
                }
                Err(e) => {
                    self.report(&format!("FAILED Removing {title}"), &e.to_string())
                        .await
                }
            }
        }

        let source = self.config.paths.src_root.join(&content_path);
        info!("torrent path is {:?}", source);
        let report = match self.transfer.transfer(&title, &source, &destination).await {
            TransferOutcome::Copied(report) | TransferOutcome::Extracted(report) => report,
            TransferOutcome::Failed => {
                error!("Nothing could be transferred from {:?}", source);
                self.report(
                    &format!("FAILED Copying {title}"),
                    &source.display().to_string(),
                )
                .await;
                return Ok(Outcome::Failed(TransferError::NoStrategy(source).into()));
            }
        };

        info!("*** DONE {:?} ***", title);
        Ok(Outcome::Delivered {
            title,
            destination,
            report,
        })
    }

    async fn report(&self, subject: &str, body: &str) {
        notify(&*self.notifier, subject, body).await;
    }
}
