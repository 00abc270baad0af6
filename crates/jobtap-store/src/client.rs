//! HTTP client for the store's function-call API.
//!
//! The store exposes named functions over two endpoints: `/api/mutation`
//! for writes and `/api/query` for reads. Both take
//! `{path, args, format: "json"}` and answer with `{status, value}` on
//! success or an `errorMessage` on failure.

use crate::error::{Result, StoreError};
use crate::normalize::NormalizedJob;
use jobtap_core::StoreConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Totals across every batch of one bulk upsert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Batches sent
    pub batches: usize,
    /// Records the store created
    pub inserted: u64,
    /// Records the store changed
    pub updated: u64,
    /// Records the store left alone
    pub skipped: u64,
    /// Records submitted
    pub total: usize,
}

#[derive(Debug, Serialize)]
struct FunctionCall<'a> {
    path: &'a str,
    args: Value,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Mutation,
    Query,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Self::Mutation => "/api/mutation",
            Self::Query => "/api/query",
        }
    }
}

/// Client for one store deployment.
pub struct StoreClient {
    client: Client,
    base_url: String,
    config: StoreConfig,
}

impl StoreClient {
    /// Create a client for the configured store.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    /// Store base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upsert `jobs` in batches of `batch_size`, pausing between batches.
    ///
    /// The first failing batch aborts the run with `UpstreamBatch`; batches
    /// already accepted stay in the store.
    pub async fn bulk_upsert(&self, jobs: &[NormalizedJob]) -> Result<SyncSummary> {
        let total = jobs.len();
        let mut summary = SyncSummary {
            total,
            ..SyncSummary::default()
        };

        let batch_size = self.config.batch_size.max(1);
        for (index, batch) in jobs.chunks(batch_size).enumerate() {
            let start = index * batch_size + 1;
            let end = start + batch.len() - 1;
            if index > 0 {
                tokio::time::sleep(self.config.batch_delay()).await;
            }

            tracing::info!("Pushing batch {}-{} of {} to store", start, end, total);
            let value = self
                .call(
                    Endpoint::Mutation,
                    &self.config.upsert_function,
                    json!({ "jobs": batch }),
                )
                .await
                .map_err(|e| StoreError::UpstreamBatch {
                    start,
                    end,
                    source: Box::new(e),
                })?;

            let (inserted, updated, skipped) =
                (count(&value, "inserted"), count(&value, "updated"), count(&value, "skipped"));
            tracing::debug!(
                "Batch {}-{}: inserted={} updated={} skipped={}",
                start,
                end,
                inserted,
                updated,
                skipped
            );
            summary.batches += 1;
            summary.inserted += inserted;
            summary.updated += updated;
            summary.skipped += skipped;
        }

        tracing::info!(
            "Store sync complete: {} inserted, {} updated, {} skipped (total: {})",
            summary.inserted,
            summary.updated,
            summary.skipped,
            summary.total
        );
        Ok(summary)
    }

    /// Every stored listing, as the store returns them.
    pub async fn list_all(&self) -> Result<Vec<Map<String, Value>>> {
        let value = self
            .call(Endpoint::Query, &self.config.list_function, json!({}))
            .await?;

        match value {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(fields) => Some(fields),
                    _ => None,
                })
                .collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::Upstream(format!(
                "expected a list, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn call(&self, endpoint: Endpoint, function: &str, args: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let payload = FunctionCall {
            path: function,
            args,
            format: "json",
        };

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::status(status.as_u16(), &body));
        }

        let parsed: FunctionResponse = serde_json::from_str(&body)?;
        if let Some(message) = parsed.error_message {
            return Err(StoreError::Upstream(message));
        }
        match parsed.status.as_deref() {
            None | Some("success") => Ok(parsed.value),
            Some(other) => Err(StoreError::Upstream(format!("function returned status {other}"))),
        }
    }
}

/// Counts arrive as JSON numbers that may be floats.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: &Value, key: &str) -> u64 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| *n > 0.0)
        .map_or(0, |n| n as u64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
