//! Jobtap Store - downstream persistence for scraped listings.
//!
//! Listings are flattened by [`normalize`] and pushed to the store through
//! its function-call HTTP API in fixed-size batches. The same normalized
//! shape is used for JSON-lines export and seed files.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod error;
pub mod jsonl;
pub mod normalize;

pub use client::{StoreClient, SyncSummary};
pub use error::{Result, StoreError};
pub use jsonl::{export, read_jsonl, seed, write_jsonl};
pub use normalize::{normalize, normalize_all, now_millis, NormalizedJob};
