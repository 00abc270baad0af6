//! Error types for the persistence client and interchange files.

use thiserror::Error;

/// Longest response body kept in a [`StoreError::Status`].
pub const BODY_LIMIT: usize = 500;

/// Errors from talking to the store or reading and writing interchange files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Store answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Leading part of the response body
        body: String,
    },

    /// Store reported a function error
    #[error("store error: {0}")]
    Upstream(String),

    /// A bulk-upsert batch failed; later batches were not sent
    #[error("batch {start}-{end} failed: {source}")]
    UpstreamBatch {
        /// 1-based index of the first record in the batch
        start: usize,
        /// 1-based index of the last record in the batch
        end: usize,
        /// Why the batch failed
        #[source]
        source: Box<StoreError>,
    },

    /// File I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Build a `Status` error, keeping at most [`BODY_LIMIT`] bytes of body.
    pub fn status(status: u16, body: &str) -> Self {
        let mut end = body.len().min(BODY_LIMIT);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        Self::Status {
            status,
            body: body[..end].to_string(),
        }
    }
}

/// Result type alias using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
