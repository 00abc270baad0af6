//! Record extraction from captured search-API bodies.
//!
//! The search API has returned several envelope shapes over time. Shapes are
//! tried in a fixed order and the first one yielding a non-empty list wins,
//! so the same body always decodes the same way.

use crate::error::DecodeError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jobtap_core::JobRecord;
use serde_json::Value;
use std::borrow::Cow;

/// Object fields that may hold the record list, in priority order.
pub const ENVELOPE_FIELDS: [&str; 5] = ["results", "jobs", "data", "items", "content"];

type Strategy = fn(&Value) -> Option<Vec<JobRecord>>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("envelope", from_envelope),
    ("search hits", from_search_hits),
    ("bare array", from_bare_array),
];

/// Decode one captured body into the records it carries.
///
/// Bodies that are themselves base64 text wrapping JSON are unwrapped first.
/// Fails with a [`DecodeError`] carrying a short preview when no shape
/// matches or every candidate list is empty.
pub fn extract_records(body: &str) -> Result<Vec<JobRecord>, DecodeError> {
    let text = unwrap_base64(body);

    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        for (name, strategy) in STRATEGIES {
            if let Some(records) = strategy(&value) {
                tracing::trace!("Decoded {} records via {}", records.len(), name);
                return Ok(records);
            }
        }
    }

    Err(DecodeError::new(body))
}

/// Base64 text is only taken as a wrapper when it decodes to something that
/// starts like JSON; plain JSON never decodes as base64 anyway.
fn unwrap_base64(body: &str) -> Cow<'_, str> {
    match STANDARD.decode(body.trim()) {
        Ok(bytes) if matches!(bytes.first(), Some(b'{' | b'[')) => match String::from_utf8(bytes) {
            Ok(decoded) => Cow::Owned(decoded),
            Err(_) => Cow::Borrowed(body),
        },
        _ => Cow::Borrowed(body),
    }
}

fn from_envelope(value: &Value) -> Option<Vec<JobRecord>> {
    let object = value.as_object()?;
    ENVELOPE_FIELDS.iter().find_map(|field| {
        let items = object.get(*field)?.as_array()?;
        objects(items)
    })
}

fn from_search_hits(value: &Value) -> Option<Vec<JobRecord>> {
    let hits = value.get("hits")?.get("hits")?.as_array()?;
    let records: Vec<JobRecord> = hits
        .iter()
        .filter_map(|hit| hit.get("_source").cloned().and_then(JobRecord::from_value))
        .collect();
    (!records.is_empty()).then_some(records)
}

fn from_bare_array(value: &Value) -> Option<Vec<JobRecord>> {
    objects(value.as_array()?)
}

/// Object elements of a list. Other elements are skipped; a list with no
/// objects does not count.
fn objects(items: &[Value]) -> Option<Vec<JobRecord>> {
    let records: Vec<JobRecord> = items
        .iter()
        .cloned()
        .filter_map(JobRecord::from_value)
        .collect();
    (!records.is_empty()).then_some(records)
}
