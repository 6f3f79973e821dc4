//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tripkit/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tripkit/` (~/.config/tripkit/)
//! - Data: `$XDG_DATA_HOME/tripkit/` (~/.local/share/tripkit/)
//! - State/Logs: `$XDG_STATE_HOME/tripkit/` (~/.local/state/tripkit/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote endpoints
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Refresh behaviour
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Remote endpoints for the three datasets and the per-substance lookup.
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Full substance catalog
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Base URL for single-substance lookups (`{base}/{name}`)
    #[serde(default = "default_drug_url_base")]
    pub drug_url_base: String,

    /// Pairwise interaction table
    #[serde(default = "default_combos_url")]
    pub combos_url: String,

    /// Interaction status definitions
    #[serde(default = "default_definitions_url")]
    pub definitions_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            drug_url_base: default_drug_url_base(),
            combos_url: default_combos_url(),
            definitions_url: default_definitions_url(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://tripsit.me/api/tripsit/getalldrugs".to_string()
}

fn default_drug_url_base() -> String {
    "https://tripsit.me/api/tripsit/getDrug".to_string()
}

fn default_combos_url() -> String {
    "https://raw.githubusercontent.com/TripSit/drugs/main/combos.json".to_string()
}

fn default_definitions_url() -> String {
    "https://raw.githubusercontent.com/TripSit/drugs/main/combo_definitions.json".to_string()
}

impl SourcesConfig {
    /// Validate that every endpoint is an http(s) URL
    pub fn validate(&self) -> Result<()> {
        for (key, url) in [
            ("sources.catalog_url", &self.catalog_url),
            ("sources.drug_url_base", &self.drug_url_base),
            ("sources.combos_url", &self.combos_url),
            ("sources.definitions_url", &self.definitions_url),
        ] {
            if !is_http_url(url) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got {:?}",
                    key, url
                )));
            }
        }
        Ok(())
    }
}

/// Refresh configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// HTTP request timeout in seconds
    #[serde(default = "default_sync_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_sync_max_retries")]
    pub max_retries: usize,

    /// Probe connectivity before fetching; when off, the fetch itself decides
    #[serde(default = "default_probe_connectivity")]
    pub probe_connectivity: bool,

    /// URL used for the connectivity probe
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Disable all network access (always report offline)
    #[serde(default)]
    pub offline: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sync_timeout(),
            max_retries: default_sync_max_retries(),
            probe_connectivity: default_probe_connectivity(),
            probe_url: default_probe_url(),
            offline: false,
        }
    }
}

fn default_sync_timeout() -> u64 {
    15
}

fn default_sync_max_retries() -> usize {
    2
}

fn default_probe_connectivity() -> bool {
    true
}

fn default_probe_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

impl SyncConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "sync.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_retries > 10 {
            return Err(Error::Config(
                "sync.max_retries must be at most 10".to_string(),
            ));
        }
        if self.probe_connectivity && !is_http_url(&self.probe_url) {
            return Err(Error::Config(format!(
                "sync.probe_url must be an http(s) URL, got {:?}",
                self.probe_url
            )));
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.sources.validate()?;
        self.sync.validate()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tripkit/config.toml` (~/.config/tripkit/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("tripkit").join("config.toml")
    }

    /// Returns the data directory path (for the cache database)
    ///
    /// `$XDG_DATA_HOME/tripkit/` (~/.local/share/tripkit/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("tripkit")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tripkit/` (~/.local/state/tripkit/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("tripkit")
    }

    /// Returns the cache database file path
    ///
    /// `$XDG_DATA_HOME/tripkit/cache.db` (~/.local/share/tripkit/cache.db)
    pub fn cache_path() -> PathBuf {
        Self::data_dir().join("cache.db")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// For CLI binaries that want explicit, stable path behavior before
    /// invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
