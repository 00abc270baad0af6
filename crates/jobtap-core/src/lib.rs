//! Jobtap Core - Foundation crate for the Jobtap listing scraper.
//!
//! This crate provides the shared record types, configuration management and
//! configuration errors that every other Jobtap crate depends on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Open-map job records, identifiers, scrape results, session state
//!
//! # Example
//!
//! ```rust
//! use jobtap_core::{AppConfig, JobRecord};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scraping.empty_round_limit, 3);
//!
//! let record = JobRecord::from_value(serde_json::json!({"id": "abc"})).unwrap();
//! assert_eq!(record.id().unwrap().as_str(), "abc");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CacheConfig, ChallengeConfig, ScrapingConfig, ServerConfig,
    StoreConfig, SyncConfig, TargetConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{JobRecord, RecordId, ScrapeResult, SessionState};
