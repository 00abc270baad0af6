//! Configuration management for Jobtap.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every timing constant used by the
//! scraper lives here so tests (and operators) can shrink or stretch it.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobtap/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Target site and search-API matching
    pub target: TargetConfig,
    /// Anti-automation challenge polling
    pub challenge: ChallengeConfig,
    /// Capture and scroll-convergence timing
    pub scraping: ScrapingConfig,
    /// Result cache settings
    pub cache: CacheConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Downstream persistence store settings
    pub store: StoreConfig,
    /// Multi-query sync settings
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBTAP_CHROME_PATH`: Browser binary path
    /// - `JOBTAP_HEADLESS`: Override browser headless mode (true/false)
    /// - `JOBTAP_STORE_URL` (or `CONVEX_URL`): Persistence store base URL
    /// - `JOBTAP_PORT` (or `SCRAPER_PORT`): HTTP server port
    /// - `JOBTAP_CACHE_TTL_SECS`: Result cache time-to-live
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|key| lookup(*key));

        if let Some(val) = first(&["JOBTAP_CHROME_PATH"]) {
            if !val.is_empty() {
                tracing::debug!("Override browser.chrome_path from env: {}", val);
                self.browser.chrome_path = Some(PathBuf::from(val));
            }
        }

        if let Some(val) = first(&["JOBTAP_HEADLESS"]) {
            match val.parse() {
                Ok(headless) => {
                    self.browser.headless = headless;
                    tracing::debug!("Override browser.headless from env: {}", headless);
                }
                Err(_) => tracing::warn!("Ignoring invalid JOBTAP_HEADLESS value: {}", val),
            }
        }

        if let Some(val) = first(&["JOBTAP_STORE_URL", "CONVEX_URL"]) {
            if !val.is_empty() {
                self.store.url = val.trim_end_matches('/').to_string();
                tracing::debug!("Override store.url from env: {}", self.store.url);
            }
        }

        if let Some(val) = first(&["JOBTAP_PORT", "SCRAPER_PORT"]) {
            match val.parse() {
                Ok(port) => {
                    self.server.port = port;
                    tracing::debug!("Override server.port from env: {}", port);
                }
                Err(_) => tracing::warn!("Ignoring invalid port value: {}", val),
            }
        }

        if let Some(val) = first(&["JOBTAP_CACHE_TTL_SECS"]) {
            match val.parse() {
                Ok(ttl) => {
                    self.cache.ttl_secs = ttl;
                    tracing::debug!("Override cache.ttl_secs from env: {}", ttl);
                }
                Err(_) => tracing::warn!("Ignoring invalid JOBTAP_CACHE_TTL_SECS value: {}", val),
            }
        }
    }

    /// Reject values that would make the scraper loop forever or never run.
    pub fn validate(&self) -> ConfigResult<()> {
        let checks: [(&str, bool); 5] = [
            ("scraping.empty_round_limit", self.scraping.empty_round_limit == 0),
            ("scraping.signal_capacity", self.scraping.signal_capacity == 0),
            ("scraping.max_pending", self.scraping.max_pending == 0),
            ("challenge.max_attempts", self.challenge.max_attempts == 0),
            ("store.batch_size", self.store.batch_size == 0),
        ];

        if let Some((field, _)) = checks.iter().find(|(_, invalid)| *invalid) {
            return Err(ConfigError::InvalidValue {
                field: (*field).to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.target.search_selectors.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target.search_selectors".to_string(),
                reason: "at least one selector is required".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobtap/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "jobtap", "jobtap").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser binary; `None` lets chromiumoxide detect an installed Chrome
    pub chrome_path: Option<PathBuf>,
    /// Run browser in headless mode
    pub headless: bool,
    /// User agent override; `None` uses the fingerprint default
    pub user_agent: Option<String>,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Extra command-line flags passed to the browser
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            user_agent: None,
            window_width: 1440,
            window_height: 900,
            extra_args: Vec::new(),
        }
    }
}

/// Target site and search-API matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Page the session navigates to on startup
    pub site_url: String,
    /// Path segment identifying search-API responses worth capturing
    pub api_path_segment: String,
    /// Count-only variant of the search API that carries no records
    pub excluded_path_segment: String,
    /// Search input selectors, primary first, then fallbacks
    pub search_selectors: Vec<String>,
    /// How long to wait for the primary selector
    pub primary_selector_timeout_ms: u64,
    /// How long to wait for each fallback selector
    pub fallback_selector_timeout_ms: u64,
    /// Pause between click/select/clear steps on the input
    pub input_pause_ms: u64,
    /// Pause after typing the query, before pressing enter
    pub typing_pause_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            site_url: "https://hiring.cafe".to_string(),
            api_path_segment: "/api/search-jobs".to_string(),
            excluded_path_segment: "get-total-count".to_string(),
            search_selectors: vec![
                "#query-search-v4".to_string(),
                r#"input[placeholder*="Search"]"#.to_string(),
                r#"input[type="search"]"#.to_string(),
            ],
            primary_selector_timeout_ms: 5000,
            fallback_selector_timeout_ms: 2000,
            input_pause_ms: 200,
            typing_pause_ms: 500,
        }
    }
}

impl TargetConfig {
    /// Timeout for the primary selector.
    #[must_use]
    pub fn primary_selector_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_selector_timeout_ms)
    }

    /// Timeout for each fallback selector.
    #[must_use]
    pub fn fallback_selector_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_selector_timeout_ms)
    }

    /// Pause between input interaction steps.
    #[must_use]
    pub fn input_pause(&self) -> Duration {
        Duration::from_millis(self.input_pause_ms)
    }

    /// Pause after typing.
    #[must_use]
    pub fn typing_pause(&self) -> Duration {
        Duration::from_millis(self.typing_pause_ms)
    }
}

/// Anti-automation challenge polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Interval between title checks
    pub poll_interval_ms: u64,
    /// Number of title checks before giving up
    pub max_attempts: u32,
    /// Case-insensitive title substrings meaning "still challenging"
    pub markers: Vec<String>,
    /// Wait after the challenge clears, for page scripts to initialize
    pub settle_ms: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 30,
            markers: vec![
                "vercel".to_string(),
                "security".to_string(),
                "checkpoint".to_string(),
            ],
            settle_ms: 5000,
        }
    }
}

impl ChallengeConfig {
    /// Interval between title checks.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Post-challenge settle time.
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Capture and scroll-convergence timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Bound on the wait for the first capture after a search
    pub first_page_timeout_ms: u64,
    /// Bound on the wait for a capture after each scroll
    pub round_timeout_ms: u64,
    /// Settle time after the first page, for near-simultaneous responses
    pub first_page_settle_ms: u64,
    /// Settle time after a round's capture signal
    pub round_settle_ms: u64,
    /// Fixed delay between scroll rounds
    pub round_delay_ms: u64,
    /// Delay between attaching the listener and issuing the search
    pub listener_settle_ms: u64,
    /// Consecutive empty rounds that count as convergence
    pub empty_round_limit: u32,
    /// Scroll budget when the caller does not give one
    pub default_max_scrolls: u32,
    /// Capacity of the "new result" wake-up channel
    pub signal_capacity: usize,
    /// Upper bound on the pending request table
    pub max_pending: usize,
    /// Age after which a pending request is abandoned
    pub pending_ttl_ms: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            first_page_timeout_ms: 45_000,
            round_timeout_ms: 8_000,
            first_page_settle_ms: 2_000,
            round_settle_ms: 1_000,
            round_delay_ms: 500,
            listener_settle_ms: 300,
            empty_round_limit: 3,
            default_max_scrolls: 200,
            signal_capacity: 100,
            max_pending: 1024,
            pending_ttl_ms: 60_000,
        }
    }
}

impl ScrapingConfig {
    /// First-page wait bound.
    #[must_use]
    pub fn first_page_timeout(&self) -> Duration {
        Duration::from_millis(self.first_page_timeout_ms)
    }

    /// Per-round wait bound.
    #[must_use]
    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    /// First-page settle delay.
    #[must_use]
    pub fn first_page_settle(&self) -> Duration {
        Duration::from_millis(self.first_page_settle_ms)
    }

    /// Per-round settle delay.
    #[must_use]
    pub fn round_settle(&self) -> Duration {
        Duration::from_millis(self.round_settle_ms)
    }

    /// Inter-round delay.
    #[must_use]
    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    /// Listener attach delay.
    #[must_use]
    pub fn listener_settle(&self) -> Duration {
        Duration::from_millis(self.listener_settle_ms)
    }

    /// Pending request time-to-live.
    #[must_use]
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_ttl_ms)
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached query result is served
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 15 * 60 }
    }
}

impl CacheConfig {
    /// Cache time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
        }
    }
}

/// Downstream persistence store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store base URL, without trailing slash
    pub url: String,
    /// Records per bulk-upsert call
    pub batch_size: usize,
    /// Delay between batches
    pub batch_delay_ms: u64,
    /// HTTP request timeout
    pub timeout_secs: u64,
    /// Mutation path for bulk upsert
    pub upsert_function: String,
    /// Query path returning every stored record
    pub list_function: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3210".to_string(),
            batch_size: 50,
            batch_delay_ms: 200,
            timeout_secs: 60,
            upsert_function: "jobs:bulkUpsert".to_string(),
            list_function: "jobs:listAll".to_string(),
        }
    }
}

impl StoreConfig {
    /// Delay between batches.
    #[must_use]
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// HTTP request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Multi-query sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Scroll budget for each explicit query
    pub per_query_max_scrolls: u32,
    /// Scroll budget for the unfiltered browse-all pass
    pub browse_all_max_scrolls: u32,
    /// Delay between consecutive queries
    pub query_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            per_query_max_scrolls: 100,
            browse_all_max_scrolls: 300,
            query_delay_ms: 2000,
        }
    }
}

impl SyncConfig {
    /// Delay between queries.
    #[must_use]
    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.browser.headless);
        assert_eq!(config.scraping.first_page_timeout(), Duration::from_secs(45));
        assert_eq!(config.scraping.round_timeout(), Duration::from_secs(8));
        assert_eq!(config.scraping.empty_round_limit, 3);
        assert_eq!(config.scraping.default_max_scrolls, 200);
        assert_eq!(config.challenge.max_attempts, 30);
        assert_eq!(config.cache.ttl(), Duration::from_secs(900));
        assert_eq!(config.store.batch_size, 50);
        assert_eq!(config.server.port, 3002);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[target]"));
        assert!(toml_str.contains("[scraping]"));
        assert!(toml_str.contains("[store]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.target.site_url, config.target.site_url);
        assert_eq!(parsed.target.search_selectors, config.target.search_selectors);
    }

    #[test]
    fn test_load_from_path() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.scraping.round_timeout_ms = 2_000;
        config.store.url = "http://store.local:9000".to_string();

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.scraping.round_timeout(), Duration::from_secs(2));
        assert_eq!(loaded.store.url, "http://store.local:9000");
    }

    #[test]
    fn test_load_from_missing_path() {
        let tmp = TempDir::new().expect("create temp dir");
        let result = AppConfig::load_from(&tmp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("JOBTAP_HEADLESS", "false"),
            ("CONVEX_URL", "http://convex.local:3210/"),
            ("SCRAPER_PORT", "4100"),
            ("JOBTAP_CACHE_TTL_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert!(!config.browser.headless);
        assert_eq!(config.store.url, "http://convex.local:3210");
        assert_eq!(config.server.port, 4100);
        // unparseable values leave the default in place
        assert_eq!(config.cache.ttl_secs, 900);
    }

    #[test]
    fn test_primary_env_name_wins() {
        let env: HashMap<&str, &str> = [
            ("JOBTAP_STORE_URL", "http://primary"),
            ("CONVEX_URL", "http://legacy"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));
        assert_eq!(config.store.url, "http://primary");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[scraping]
empty_round_limit = 5

[target]
site_url = "https://jobs.example.com"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.scraping.empty_round_limit, 5);
        assert_eq!(config.target.site_url, "https://jobs.example.com");
        // These should be defaults
        assert_eq!(config.scraping.round_timeout_ms, 8_000);
        assert_eq!(config.target.api_path_segment, "/api/search-jobs");
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = AppConfig::default();
        config.scraping.empty_round_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scraping.empty_round_limit"));

        let mut config = AppConfig::default();
        config.target.search_selectors.clear();
        assert!(config.validate().is_err());
    }
}
