//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed endpoint and HTTP settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Where snapshot logs are written
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scrape schedule and entity selectors
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        let url = Url::parse(&self.feed.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "feed.url must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.storage.log_root.as_os_str().is_empty() {
            return Err(AppError::validation("storage.log_root is empty"));
        }
        if self.scrape.interval_secs == 0 {
            return Err(AppError::validation("scrape.interval_secs must be > 0"));
        }
        Ok(())
    }
}

/// Feed endpoint and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Live feed endpoint
    #[serde(default = "defaults::url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Snapshot log storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the snapshot logs
    #[serde(default = "defaults::log_root")]
    pub log_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_root: defaults::log_root(),
        }
    }
}

/// Scrape schedule and the entities to snapshot every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Pause between the end of one cycle and the start of the next
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// How long a graceful shutdown waits for the running cycle
    #[serde(default = "defaults::shutdown_grace")]
    pub shutdown_grace_secs: u64,

    #[serde(default)]
    pub country_codes: Vec<String>,

    #[serde(default)]
    pub organization_names: Vec<String>,

    #[serde(default)]
    pub city_ids: Vec<u64>,

    #[serde(default)]
    pub station_ids: Vec<u64>,

    #[serde(default)]
    pub bike_ids: Vec<u64>,
}

impl ScrapeConfig {
    /// Number of configured selectors across all entity kinds.
    pub fn selector_count(&self) -> usize {
        self.country_codes.len()
            + self.organization_names.len()
            + self.city_ids.len()
            + self.station_ids.len()
            + self.bike_ids.len()
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            shutdown_grace_secs: defaults::shutdown_grace(),
            country_codes: Vec::new(),
            organization_names: Vec::new(),
            city_ids: Vec::new(),
            station_ids: Vec::new(),
            bike_ids: Vec::new(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Feed defaults
    pub fn url() -> String {
        "https://api.nextbike.net/maps/nextbike-live.json".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; nextbike-scraper/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Storage defaults
    pub fn log_root() -> PathBuf {
        PathBuf::from("logfiles")
    }

    // Scrape defaults
    pub fn interval() -> u64 {
        60
    }
    pub fn shutdown_grace() -> u64 {
        10
    }

    pub fn level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.feed.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.scrape.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let mut config = Config::default();
        config.feed.url = "ftp://api.nextbike.net/live.json".to_string();
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));

        config.feed.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            log_root = "/var/lib/nextbike"

            [scrape]
            interval_secs = 300
            country_codes = ["de"]
            city_ids = [619]
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.url, defaults::url());
        assert_eq!(config.storage.log_root, PathBuf::from("/var/lib/nextbike"));
        assert_eq!(config.scrape.interval_secs, 300);
        assert_eq!(config.scrape.shutdown_grace_secs, 10);
        assert_eq!(config.scrape.city_ids, vec![619]);
        assert_eq!(config.scrape.selector_count(), 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/nonexistent/nextbike.toml");
        assert_eq!(config.scrape.interval_secs, 60);
    }
}
