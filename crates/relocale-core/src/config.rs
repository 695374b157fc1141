use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::rewrite::RewriteMode;

/// Environment variable holding the CMS API credential.
pub const API_KEY_ENV: &str = "HUBSPOT_API_KEY";

/// Retry policy for CMS transport failures (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per CMS request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.5,
            max_delay_secs: 10,
        }
    }
}

impl RetryConfig {
    /// Rejects delays that cannot be expressed as a `Duration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secs = self.base_delay_secs;
        if secs < 0.0 || std::time::Duration::try_from_secs_f64(secs).is_err() {
            return Err(ConfigError::InvalidRetryDelay(secs));
        }
        Ok(())
    }
}

/// Fatal startup configuration problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HUBSPOT_API_KEY environment variable is not set and config has no api_key")]
    MissingCredential,
    #[error("batch size must be a positive integer, got {0:?}")]
    InvalidBatchSize(String),
    #[error("retry.base_delay_secs must be a finite, non-negative number of seconds, got {0}")]
    InvalidRetryDelay(f64),
}

/// Global configuration loaded from `~/.config/relocale/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocaleConfig {
    /// Base URL of the CMS API.
    pub cms_base_url: String,
    /// Pages per chunk when running a batch.
    pub batch_size: usize,
    /// CSV file with link mappings.
    pub link_mappings_path: PathBuf,
    /// CSV file with image mappings.
    pub image_mappings_path: PathBuf,
    /// How mapping tables are applied to content.
    #[serde(default)]
    pub rewrite_mode: RewriteMode,
    /// API credential. `HUBSPOT_API_KEY` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Log file; defaults to the XDG state dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for RelocaleConfig {
    fn default() -> Self {
        Self {
            cms_base_url: "https://api.hubapi.com".to_string(),
            batch_size: 10,
            link_mappings_path: PathBuf::from("link_mappings.csv"),
            image_mappings_path: PathBuf::from("image_mappings.csv"),
            rewrite_mode: RewriteMode::default(),
            api_key: None,
            log_file_path: None,
            retry: None,
        }
    }
}

impl RelocaleConfig {
    /// Applies environment overrides. `lookup` is `std::env::var(..).ok()` in
    /// production and a map lookup in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(p) = lookup("LINK_MAPPINGS_PATH") {
            self.link_mappings_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("IMAGE_MAPPINGS_PATH") {
            self.image_mappings_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("LOG_FILE_PATH") {
            self.log_file_path = Some(PathBuf::from(p));
        }
        if let Some(raw) = lookup("BATCH_SIZE") {
            self.batch_size = parse_batch_size(&raw)?.get();
        }
        Ok(())
    }

    /// Returns the API credential or the fatal missing-credential error.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential)
    }

    pub fn batch_size(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| ConfigError::InvalidBatchSize(self.batch_size.to_string()))
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Copy that is safe to log: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.api_key.is_some() {
            cfg.api_key = Some("***".to_string());
        }
        cfg
    }
}

/// Parses a batch size from text; zero and non-numbers are rejected.
pub fn parse_batch_size(raw: &str) -> Result<NonZeroUsize, ConfigError> {
    raw.trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| ConfigError::InvalidBatchSize(raw.to_string()))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("relocale")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists,
/// then apply environment overrides.
pub fn load_or_init() -> Result<RelocaleConfig> {
    let path = config_path()?;
    let mut cfg = load_or_init_at(&path)?;
    cfg.apply_env(|name| std::env::var(name).ok())?;
    Ok(cfg)
}

/// Like [`load_or_init`] for an explicit path, without environment overrides.
pub fn load_or_init_at(path: &Path) -> Result<RelocaleConfig> {
    if !path.exists() {
        let default_cfg = RelocaleConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RelocaleConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.batch_size()?;
    cfg.retry_config().validate()?;
    Ok(cfg)
}
