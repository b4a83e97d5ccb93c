pub mod cleaner;

pub use cleaner::StaleFileCleaner;

use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::{debug, info, warn};

use crate::config::AliasMap;
use crate::error::ResolutionError;

/// Turn a raw marker title into the show folder name we expect in the library.
///
/// Aliases win over title-casing and are used verbatim.
pub fn normalize_title(raw_title: &str, aliases: &AliasMap) -> String {
    let spaced = raw_title.to_lowercase().replace('.', " ");
    if let Some(alias) = aliases.get(&spaced) {
        return alias.to_string();
    }
    title_case(spaced.trim())
}

/// Uppercase every letter that follows a non-letter, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if prev_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}

/// Finds the show directory for a normalized title under the library root
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    library_root: PathBuf,
}

impl DestinationResolver {
    pub fn new(library_root: PathBuf) -> Self {
        Self { library_root }
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Case-insensitive exact match against the library root's children.
    ///
    /// When several entries match (e.g. `Bluey` and `bluey` on a case-sensitive
    /// filesystem) the lexicographically smallest name wins.
    pub async fn resolve(&self, title: &str) -> Result<PathBuf, ResolutionError> {
        let listing_error = |source: std::io::Error| ResolutionError::Listing {
            root: self.library_root.clone(),
            source,
        };

        let wanted = title.to_lowercase();
        let mut matches = Vec::new();
        let mut entries = async_fs::read_dir(&self.library_root)
            .await
            .map_err(listing_error)?;

        while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_lowercase() == wanted {
                debug!("\"{}\" == \"{}\"", title, name);
                matches.push(name);
            }
        }

        matches.sort();
        if matches.len() > 1 {
            warn!(
                "{} library entries match \"{}\", using \"{}\"",
                matches.len(),
                title,
                matches[0]
            );
        }

        let Some(name) = matches.into_iter().next() else {
            return Err(ResolutionError::NoMatch {
                title: title.to_string(),
                root: self.library_root.clone(),
            });
        };

        let destination = self.library_root.join(name);
        if !destination.is_dir() {
            return Err(ResolutionError::NotADirectory(destination));
        }

        info!("Going with {:?}", destination);
        Ok(destination)
    }
}
