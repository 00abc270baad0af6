//! JSON-lines interchange: one listing per line.
//!
//! Exports strip the store's bookkeeping fields so a file can be seeded into
//! a fresh deployment as-is.

use crate::client::{StoreClient, SyncSummary};
use crate::error::Result;
use crate::normalize::{now_millis, NormalizedJob};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Fields the store adds to every document.
pub const STORAGE_FIELDS: [&str; 2] = ["_id", "_creationTime"];

/// Write `records` to `path`, one object per line, without storage fields.
///
/// Parent directories are created. Returns the number of lines written.
pub fn write_jsonl(path: &Path, records: Vec<Map<String, Value>>) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for mut record in records {
        for field in STORAGE_FIELDS {
            record.remove(field);
        }
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Read normalized listings from `path`.
///
/// Blank lines are ignored; lines that do not parse are logged and skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<NormalizedJob>> {
    let reader = BufReader::new(File::open(path)?);
    let mut jobs = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<NormalizedJob>(&line) {
            Ok(job) => jobs.push(job),
            Err(e) => tracing::warn!("Skipping bad line {}: {}", index + 1, e),
        }
    }

    Ok(jobs)
}

/// Export every stored listing to `path`.
pub async fn export(client: &StoreClient, path: &Path) -> Result<usize> {
    tracing::info!("Exporting listings from {}", client.base_url());
    let records = client.list_all().await?;
    let written = write_jsonl(path, records)?;
    tracing::info!("Exported {} listings to {}", written, path.display());
    Ok(written)
}

/// Load listings from `path`, stamp them as scraped now, and upsert them.
pub async fn seed(client: &StoreClient, path: &Path) -> Result<SyncSummary> {
    let mut jobs = read_jsonl(path)?;
    tracing::info!("Loaded {} listings from {}", jobs.len(), path.display());

    let now = now_millis();
    for job in &mut jobs {
        job.scraped_at = now;
    }

    client.bulk_upsert(&jobs).await
}
