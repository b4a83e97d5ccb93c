pub mod once;
pub mod watch;

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::config::{Config, Paths};
use crate::mailer::{Mailer, Notifier};
use crate::pipeline::Pipeline;

/// Fail early unless every configured directory exists
pub fn check_paths(paths: &Paths) -> Result<()> {
    for (label, dir) in [
        ("Source", &paths.src_root),
        ("Finished", &paths.finished_dir),
        ("Destination", &paths.dest_root),
    ] {
        if !dir.exists() {
            return Err(anyhow!("{} directory does not exist: {:?}", label, dir));
        }
        if !dir.is_dir() {
            return Err(anyhow!("{} path is not a directory: {:?}", label, dir));
        }
    }
    Ok(())
}

/// Pipeline wired to the SMTP mailer described by `config`
pub fn build_pipeline(config: Config) -> Result<Arc<Pipeline>> {
    let notifier: Arc<dyn Notifier> = Arc::new(Mailer::new(config.smtp.as_ref())?);
    Ok(Arc::new(Pipeline::new(Arc::new(config), notifier)?))
}
