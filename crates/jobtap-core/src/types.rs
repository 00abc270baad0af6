//! Shared types used across Jobtap.
//!
//! Job listings arrive with no contractual schema, so a [`JobRecord`] is an
//! open map from field name to JSON value. Only the identifier is given a
//! dedicated type, because it is what cross-page deduplication keys on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fields consulted, in order, to resolve a record's identifier.
pub const ID_FIELDS: [&str; 2] = ["id", "objectID"];

/// Stable identifier of a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Create a `RecordId`, rejecting empty strings.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single job listing as decoded from a captured response.
///
/// All field access is by key and returns `Option`; nothing is coerced to a
/// default. Records are not mutated after decoding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRecord(Map<String, Value>);

impl JobRecord {
    /// Wrap an existing JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Convert a JSON value into a record. Non-objects yield `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a field that must be a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Look up a field that must be an object.
    #[must_use]
    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Resolve the identifier: `id`, falling back to `objectID`.
    ///
    /// Strings and integers are accepted; empty strings are not identifiers.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        ID_FIELDS.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(s) => RecordId::new(s.as_str()),
            Value::Number(n) if n.is_i64() || n.is_u64() => RecordId::new(n.to_string()),
            _ => None,
        })
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the record, returning the underlying map.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

/// Outcome of a search or scrape operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Query as given by the caller; empty means "browse all"
    pub query: String,
    /// Number of records in `jobs`
    pub scraped: usize,
    /// The records
    pub jobs: Vec<JobRecord>,
}

impl ScrapeResult {
    /// Build a result, deriving `scraped` from the record count.
    #[must_use]
    pub fn new(query: impl Into<String>, jobs: Vec<JobRecord>) -> Self {
        Self {
            query: query.into(),
            scraped: jobs.len(),
            jobs,
        }
    }
}

/// Lifecycle of a scrape session against one browser page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Browser launched, target page or challenge not yet cleared
    Initializing,
    /// Idle and able to accept an operation
    Ready,
    /// Single-page search or first page of a full scrape in flight
    Searching,
    /// Scroll pagination in flight
    Scrolling,
    /// Scroll pagination stopped growing; about to return to `Ready`
    Converged,
    /// Initialization failed; the session cannot be used
    Failed,
}

impl SessionState {
    /// Whether a new operation may start.
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Searching => "searching",
            Self::Scrolling => "scrolling",
            Self::Converged => "converged",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}
