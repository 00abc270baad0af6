//! Jobtap Scraper - paginated network-capture scrape engine.
//!
//! The target site only exposes results through XHR calls fired by UI
//! interaction, so this crate drives the page and listens to the traffic
//! it generates instead of calling the API directly.
//!
//! # Features
//!
//! - Capture of search-API response bodies from the browser's network feed
//! - Ordered-fallback decoding of the several envelope shapes the API uses
//! - Scroll pagination that stops once consecutive rounds add nothing new
//! - Cross-page deduplication by listing identifier (last write wins)
//! - Per-query TTL cache with single-flight access to the one browser
//!
//! # Example
//!
//! ```rust,ignore
//! use jobtap_scraper::{ResultCache, ScrapeSession, SessionConfig};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(BrowserEngine::launch(&config.browser).await?);
//! let mut session = ScrapeSession::new(engine, SessionConfig::from(&config));
//! session.initialize().await?;
//!
//! let everything = session.scrape_all("rust engineer", None).await?;
//! println!("{} unique listings", everything.result.scraped);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod accumulator;
pub mod cache;
pub mod capture;
pub mod convergence;
pub mod error;
pub mod extractor;
pub mod interaction;
pub mod session;

// Re-export commonly used types
pub use accumulator::{Accumulator, MergeOutcome};
pub use cache::ResultCache;
pub use capture::{CaptureBuffer, CaptureCursor, ResponseFilter};
pub use convergence::{ControllerState, ConvergenceReport, ScrollController, Termination};
pub use error::{DecodeError, Result, ScrapeError};
pub use extractor::extract_records;
pub use interaction::{SearchAction, SearchPage};
pub use session::{ConvergedScrape, ScrapeSession, SessionConfig};
