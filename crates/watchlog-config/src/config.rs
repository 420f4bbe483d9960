use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trakt: TraktConfig,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

/// Poster lookups are only performed when a TMDB key is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Note file that is overwritten on every sync
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Moment-style tokens (YYYY-MM-DD) or a strftime pattern (%Y-%m-%d)
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Chronological,
    #[default]
    Alphabetical,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Chronological => "chronological",
            SortOrder::Alphabetical => "alphabetical",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chronological" | "date" => Ok(SortOrder::Chronological),
            "alphabetical" | "title" => Ok(SortOrder::Alphabetical),
            other => Err(format!("Invalid sort order: {}. Use 'chronological' or 'alphabetical'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Entries watched before this date are left out of the note
    #[serde(default = "default_ignore_before")]
    pub ignore_before: String,
    /// Upper bound on concurrent poster / episode-id lookups
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Six-field cron expression (seconds first)
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Trakt client_id is not configured")]
    MissingClientId,
    #[error("Trakt client_secret is not configured")]
    MissingClientSecret,
    #[error("Output path is not configured")]
    MissingOutputPath,
    #[error("TMDB is configured but api_key is empty")]
    MissingTmdbKey,
    #[error("Invalid ignore_before date '{0}': expected YYYY-MM-DD")]
    InvalidCutoff(String),
    #[error("sync.concurrency must be at least 1")]
    InvalidConcurrency,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_date_format() -> String {
    "YYYY-MM-DD".to_string()
}

fn default_ignore_before() -> String {
    "1970-01-01".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 0 */6 * * *".to_string() // Every 6 hours
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            date_format: default_date_format(),
            sort_order: SortOrder::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ignore_before: default_ignore_before(),
            concurrency: default_concurrency(),
        }
    }
}

impl SyncConfig {
    /// Start of the cutoff day in UTC.
    pub fn cutoff(&self) -> Result<DateTime<Utc>, ConfigError> {
        let date = parse_cutoff(&self.ignore_before)?;
        Ok(date.and_time(NaiveTime::default()).and_utc())
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY.MM.DD` and `YYYY/MM/DD`.
pub fn parse_cutoff(value: &str) -> Result<NaiveDate, ConfigError> {
    let normalized = value.trim().replace(['.', '/'], "-");
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .map_err(|_| ConfigError::InvalidCutoff(value.to_string()))
}

fn is_placeholder(value: &str, placeholder: &str) -> bool {
    value.trim().is_empty() || value == placeholder
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_placeholder(&self.trakt.client_id, "YOUR_CLIENT_ID") {
            return Err(ConfigError::MissingClientId);
        }
        if is_placeholder(&self.trakt.client_secret, "YOUR_CLIENT_SECRET") {
            return Err(ConfigError::MissingClientSecret);
        }
        match &self.output.path {
            Some(path) if !path.as_os_str().is_empty() => {}
            _ => return Err(ConfigError::MissingOutputPath),
        }
        if let Some(tmdb) = &self.tmdb {
            if tmdb.api_key.trim().is_empty() {
                return Err(ConfigError::MissingTmdbKey);
            }
        }
        if self.sync.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        self.sync.cutoff()?;
        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        !is_placeholder(&self.trakt.client_id, "YOUR_CLIENT_ID")
            && !is_placeholder(&self.trakt.client_secret, "YOUR_CLIENT_SECRET")
    }
}
