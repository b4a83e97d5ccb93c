use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Show names that don't title-case into their library folder name
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("the.voice", "The Voice (US)"),
    ("the.walking.dead", "Walking Dead"),
    ("startalk", "StarTalk"),
    ("masterchef.us", "MasterChef (US)"),
    ("stephen.colbert", "The Late Show with Stephen Colbert"),
];

const DEFAULT_SMTP_PORT: u16 = 587;

/// Directory layout the tool works against
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    /// Where the torrent client leaves downloaded content
    pub src_root: PathBuf,
    /// Library root with one directory per show
    pub dest_root: PathBuf,
    /// Directory the client drops `.torrent` marker files into when a download finishes
    pub finished_dir: PathBuf,
}

impl Paths {
    pub fn new(src_root: PathBuf, dest_root: PathBuf, finished_dir: Option<PathBuf>) -> Self {
        let finished_dir = finished_dir.unwrap_or_else(|| src_root.join("finished"));
        Self {
            src_root,
            dest_root,
            finished_dir,
        }
    }
}

/// Mail transport settings. Only present when every setting was supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl SmtpConfig {
    /// Read SMTP settings from the environment, `None` if any required one is missing
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok()?;
        let username = env::var("SMTP_USERNAME").ok()?;
        let password = env::var("SMTP_PASSWORD").ok()?;
        let from = env::var("SMTP_FROM").ok()?;
        let to = env::var("SMTP_TO").ok()?;
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        Some(Self {
            host,
            port,
            username,
            password,
            from,
            to,
        })
    }
}

/// Case and separator insensitive mapping from a raw show title to its library folder name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasMap {
    entries: HashMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The aliases every install starts with
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        for (key, value) in DEFAULT_ALIASES {
            map.insert(key, *value);
        }
        map
    }

    /// Lowercase and turn dots into spaces, so `the.voice` and `The Voice` share a key
    pub fn normalize_key(key: &str) -> String {
        key.trim().to_lowercase().replace('.', " ")
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(Self::normalize_key(key), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&Self::normalize_key(key))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `key=Value;key=Value` pairs, skipping malformed entries
    pub fn extend_from_pairs(&mut self, pairs: &str) {
        for pair in pairs.split(';') {
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                    self.insert(key, value.trim());
                }
                _ if pair.trim().is_empty() => {}
                _ => debug!("Ignoring malformed alias entry: {:?}", pair),
            }
        }
    }

    /// Merge a JSON object of `{"raw title": "Library Folder"}` pairs
    pub fn extend_from_json(&mut self, json: &str) -> Result<()> {
        let file: AliasFile = serde_json::from_str(json)?;
        for (key, value) in file.0 {
            self.insert(&key, value);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AliasFile(HashMap<String, String>);

/// Runtime configuration shared by the watcher, worker and pipeline
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    /// Extensions (without dot) treated as playable media
    pub media_extensions: Vec<String>,
    /// Extensions (without dot) handed to the extraction command
    pub archive_extensions: Vec<String>,
    /// External extraction program, invoked as `<cmd> x -o+ -y <archive> <dest>/`
    pub extract_command: String,
    pub aliases: AliasMap,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    /// Configuration with built-in defaults and notifications disabled
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            media_extensions: vec!["mkv".to_string()],
            archive_extensions: vec!["rar".to_string()],
            extract_command: "unrar".to_string(),
            aliases: AliasMap::with_defaults(),
            smtp: None,
        }
    }

    /// Load configuration from environment variables with defaults
    pub fn from_env(paths: Paths) -> Result<Self> {
        let mut config = Self::new(paths);

        if let Ok(exts) = env::var("MEDIA_EXTENSIONS") {
            config.media_extensions = parse_extension_list(&exts, &config.media_extensions);
        }
        if let Ok(exts) = env::var("ARCHIVE_EXTENSIONS") {
            config.archive_extensions = parse_extension_list(&exts, &config.archive_extensions);
        }
        if let Ok(command) = env::var("EXTRACT_COMMAND") {
            if !command.trim().is_empty() {
                config.extract_command = command.trim().to_string();
            }
        }
        if let Ok(file) = env::var("ALIASES_FILE") {
            config.load_alias_file(Path::new(&file))?;
        }
        if let Ok(pairs) = env::var("TITLE_ALIASES") {
            config.aliases.extend_from_pairs(&pairs);
        }
        config.smtp = SmtpConfig::from_env();

        Ok(config)
    }

    fn load_alias_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias file {path:?}"))?;
        self.aliases
            .extend_from_json(&content)
            .with_context(|| format!("Invalid alias file {path:?}"))
    }
}

/// Split a comma separated extension list, dropping dots and blanks.
/// An empty result keeps the fallback.
fn parse_extension_list(raw: &str, fallback: &[String]) -> Vec<String> {
    let exts: Vec<String> = raw
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    if exts.is_empty() {
        fallback.to_vec()
    } else {
        exts
    }
}
