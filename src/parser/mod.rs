use anyhow::Result;
use regex::Regex;

use crate::error::ParseError;

/// Marker name layout: `<title><sep><episode><anything>[ [TD]].torrent`
///
/// The date separators are deliberately `.` (any character) so that
/// `2024-10-02` and `2024 10 02` style air dates match too.
const MARKER_PATTERN: &str = r"^(?P<path>(?P<title>.*?)[ .]+(?P<episode>[sS]\d+[eE]\d+|\d{4}.\d{2}.\d{2}).*?)(?:[ .]+\[TD\])?\.torrent$";

/// What a finished-download marker tells us about the content it announces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTorrent {
    /// Show title as it appears in the marker, e.g. `Stephen.Colbert`
    pub title: String,
    /// `S01E02` style or air date token, verbatim
    pub episode: String,
    /// Name of the downloaded file or directory under the source root
    pub content_path: String,
}

/// Extracts title, episode and content path from marker filenames
#[derive(Debug, Clone)]
pub struct NameParser {
    pattern: Regex,
}

impl NameParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(MARKER_PATTERN)?,
        })
    }

    pub fn parse(&self, marker_name: &str) -> Result<ParsedTorrent, ParseError> {
        let caps = self
            .pattern
            .captures(marker_name)
            .ok_or_else(|| ParseError::NoMatch(marker_name.to_string()))?;

        let [title, episode, path] = ["title", "episode", "path"].map(|name| {
            caps.name(name)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
        });

        match (title, episode, path) {
            (Some(title), Some(episode), Some(path)) => Ok(ParsedTorrent {
                title: title.to_string(),
                episode: episode.to_string(),
                content_path: path.to_string(),
            }),
            _ => Err(ParseError::IncompleteMatch(marker_name.to_string())),
        }
    }
}
