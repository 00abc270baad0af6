//! CLI command implementations.

use crate::server;
use crate::sync::{collect, parse_queries};
use anyhow::{bail, Context, Result};
use jobtap_browser::{BrowserActions, BrowserEngine};
use jobtap_core::AppConfig;
use jobtap_scraper::{ResultCache, ScrapeSession, SessionConfig};
use jobtap_store::{normalize_all, now_millis, StoreClient};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Launch the browser and bring a session to `Ready`.
///
/// The engine is returned so the caller can close it when done.
async fn open_session(config: &AppConfig) -> Result<(Arc<BrowserEngine>, ScrapeSession)> {
    let engine = Arc::new(
        BrowserEngine::launch(&config.browser)
            .await
            .context("failed to launch browser")?,
    );
    let actions: Arc<dyn BrowserActions> = engine.clone();
    let mut session = ScrapeSession::new(actions, SessionConfig::from(config));

    if let Err(e) = session.initialize().await {
        close(&engine).await;
        return Err(e).context("failed to initialize scrape session");
    }
    Ok((engine, session))
}

async fn close(engine: &BrowserEngine) {
    if let Err(e) = engine.close().await {
        warn!("Failed to close browser: {}", e);
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Single-page search, printed as JSON or written to `output`.
pub async fn query(config: &AppConfig, query: &str, output: Option<&Path>) -> Result<()> {
    let (engine, mut session) = open_session(config).await?;
    let result = session.search_once(query).await;
    close(&engine).await;
    let result = result.context("search failed")?;

    match output {
        Some(path) => {
            write_json(path, &result)?;
            info!("Wrote {} listings to {}", result.scraped, path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

/// Scrape to convergence for each query, normalize and push to the store.
pub async fn sync(config: &AppConfig, queries: Option<&str>, output: Option<&Path>) -> Result<()> {
    let queries = queries.map(parse_queries).unwrap_or_default();
    let client = StoreClient::new(&config.store).context("failed to build store client")?;

    let (engine, mut session) = open_session(config).await?;
    let collected = collect(&mut session, &queries, &config.sync).await;
    close(&engine).await;
    let collected = collected.context("scrape failed")?;

    if !collected.failed.is_empty() {
        warn!("Skipped failed queries: {:?}", collected.failed);
    }
    if collected.unidentified > 0 {
        warn!("Dropped {} listings without an id", collected.unidentified);
    }

    let jobs = normalize_all(&collected.records, now_millis());
    info!("Collected {} unique listings", jobs.len());

    if let Some(path) = output {
        write_json(path, &jobs)?;
        info!("Wrote normalized listings to {}", path.display());
    }

    let summary = client
        .bulk_upsert(&jobs)
        .await
        .context("failed to push listings")?;
    info!(
        "Sync complete: {} inserted, {} updated, {} skipped ({} total in {} batches)",
        summary.inserted, summary.updated, summary.skipped, summary.total, summary.batches
    );
    Ok(())
}

/// Export every stored listing to a JSON-lines file.
pub async fn export(config: &AppConfig, output: &Path) -> Result<()> {
    let client = StoreClient::new(&config.store).context("failed to build store client")?;
    let written = jobtap_store::export(&client, output)
        .await
        .context("export failed")?;
    info!("Exported {} listings to {}", written, output.display());
    Ok(())
}

/// Load a JSON-lines file into the store.
pub async fn seed(config: &AppConfig, input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("seed file not found: {}", input.display());
    }
    let client = StoreClient::new(&config.store).context("failed to build store client")?;
    let summary = jobtap_store::seed(&client, input)
        .await
        .context("seed failed")?;
    info!(
        "Seeded {} listings: {} inserted, {} updated, {} skipped",
        summary.total, summary.inserted, summary.updated, summary.skipped
    );
    Ok(())
}

/// Initialize the session, then serve the HTTP API.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let (engine, session) = open_session(config).await?;
    let cache = Arc::new(ResultCache::new(session, config.cache.ttl()));

    let served = server::serve(&config.server, cache).await;
    close(&engine).await;
    served
}
