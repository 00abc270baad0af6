//! Browser automation engine for search-driven sites.
//!
//! Provides headless browser control with anti-detection launch flags,
//! anti-automation challenge resolution, and a network-event feed that
//! downstream capture code consumes as plain messages.

pub mod actions;
pub mod challenge;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{
    redact_url, BrowserActions, Key, NetworkEvent, NetworkEventStream, RequestId, ResponseBody,
};
pub use challenge::resolve_challenge;
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
