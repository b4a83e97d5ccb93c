//! # btex - Bittorrent Extractor
//!
//! Watches the torrent client's `finished` directory for `.torrent` marker files
//! and files each finished episode into the matching show directory of a TV library.
//!
//! ## Features
//!
//! - **Name Parsing**: Pulls the show title and `S01E02` or air-date token out of release names
//! - **Library Matching**: Case-insensitive show folder lookup with configurable title aliases
//! - **Stale Cleanup**: Removes older copies of the same episode before filing the new one
//! - **Flexible Sources**: Copies from release folders or single files, or extracts `.rar` releases
//! - **Mail Reports**: Every copy, removal and failure is mailed when SMTP is configured
//!
//! ## Usage
//!
//! ```bash
//! # Watch for finished downloads until interrupted
//! btex --src-path ~/torrents --dest-path /srv/video/tv watch
//!
//! # Process whatever has already finished, then exit
//! btex --src-path ~/torrents --dest-path /srv/video/tv once
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btex::commands::{once::OnceCommand, watch::WatchCommand};
use btex::config::{Config, Paths};

/// btex - Files finished torrent downloads into a TV library
#[derive(Parser)]
#[command(
    name = "btex",
    about = "Files finished torrent downloads into a TV library",
    long_about = "Watches for .torrent marker files, copies or extracts the announced episode into the matching show directory and mails a report.",
    version
)]
struct Cli {
    /// Directory the torrent client downloads into
    #[arg(long, env = "SRC_PATH")]
    src_path: PathBuf,
    /// Library root containing one directory per show
    #[arg(long, env = "DEST_PATH")]
    dest_path: PathBuf,
    /// Directory holding finished .torrent markers (defaults to <SRC_PATH>/finished)
    #[arg(long, env = "FINISHED_PATH")]
    finished_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Process existing markers, then watch for new ones until interrupted
    Watch,
    /// Process existing markers once and exit
    Once,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "btex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let paths = Paths::new(cli.src_path, cli.dest_path, cli.finished_path);

    let result = match Config::from_env(paths) {
        Ok(config) => match cli.command {
            Commands::Watch => {
                info!("Starting watch command with paths: {:?}", config.paths);
                WatchCommand::new(config).execute().await
            }
            Commands::Once => {
                info!("Starting once command with paths: {:?}", config.paths);
                OnceCommand::new(config).execute().await.map(|_| ())
            }
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
