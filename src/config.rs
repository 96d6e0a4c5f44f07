//! Runtime configuration
//!
//! Defaults come from `constants.rs`; every field can be overridden with a
//! `SWIPETUNE_*` environment variable (a `.env` file is honoured).

use crate::constants::*;
use crate::error::{ClientError, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub batch_size: usize,
    pub low_watermark: usize,
    pub max_cached_tracks: usize,
    pub dislike_ttl_secs: u64,
    pub show_instructions: bool,
    pub data_dir: PathBuf,
    pub storage_secret: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            low_watermark: DEFAULT_LOW_WATERMARK,
            max_cached_tracks: DEFAULT_MAX_CACHED_TRACKS,
            dislike_ttl_secs: DEFAULT_DISLIKE_TTL_SECS,
            show_instructions: true,
            data_dir: default_data_dir(),
            storage_secret: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("[Config] No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("SWIPETUNE_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "SWIPETUNE_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var::<usize>(&lookup, "SWIPETUNE_BATCH_SIZE")? {
            config.batch_size = size;
        }
        if let Some(mark) = parse_var::<usize>(&lookup, "SWIPETUNE_LOW_WATERMARK")? {
            config.low_watermark = mark;
        }
        if let Some(max) = parse_var::<usize>(&lookup, "SWIPETUNE_MAX_CACHED_TRACKS")? {
            config.max_cached_tracks = max;
        }
        if let Some(days) = parse_var::<u64>(&lookup, "SWIPETUNE_DISLIKE_TTL_DAYS")? {
            config.dislike_ttl_secs = days * 24 * 60 * 60;
        }
        if let Some(show) = parse_var::<bool>(&lookup, "SWIPETUNE_SHOW_INSTRUCTIONS")? {
            config.show_instructions = show;
        }
        if let Some(dir) = lookup("SWIPETUNE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.storage_secret = lookup("SWIPETUNE_STORAGE_SECRET").filter(|s| !s.is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ClientError::Config("batch size must be at least 1".into()));
        }
        if self.max_cached_tracks == 0 {
            return Err(ClientError::Config("max cached tracks must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Config("request timeout must be positive".into()));
        }
        if reqwest::Url::parse(&self.api_url).is_err() {
            return Err(ClientError::Config(format!("invalid API URL '{}'", self.api_url)));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}
