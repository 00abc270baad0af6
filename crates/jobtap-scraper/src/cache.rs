//! Per-query result cache in front of a single scrape session.
//!
//! The session can run one operation at a time, so callers queue on its
//! lock. A caller that queued behind a scrape of the same query finds the
//! fresh entry after acquiring the lock and does not scrape again.

use crate::error::Result;
use crate::session::ScrapeSession;
use jobtap_core::{ScrapeResult, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<ScrapeResult>,
    cached_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) < ttl
    }
}

/// Serves single-page search results, scraping at most once per query per TTL.
pub struct ResultCache {
    session: Mutex<ScrapeSession>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Put a cache in front of `session`.
    pub fn new(session: ScrapeSession, ttl: Duration) -> Self {
        Self {
            session: Mutex::new(session),
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Initialize the underlying session.
    pub async fn initialize(&self) -> Result<()> {
        self.session.lock().await.initialize().await
    }

    /// Session state. Waits while an operation holds the session.
    pub async fn session_state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Cached result for `query` if fresh, otherwise scrape one page.
    ///
    /// Failures are not cached.
    pub async fn search(&self, query: &str) -> Result<Arc<ScrapeResult>> {
        let key = query.trim();

        if let Some(hit) = self.lookup(key).await {
            tracing::debug!("Cache hit for {:?}", key);
            return Ok(hit);
        }

        let mut session = self.session.lock().await;
        if let Some(hit) = self.lookup(key).await {
            tracing::debug!("Cache filled while waiting for {:?}", key);
            return Ok(hit);
        }

        // the session lock is held until the entry is stored
        let result = Arc::new(session.search_once(key).await?);

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh(self.ttl, now));
        entries.insert(
            key.to_string(),
            CacheEntry {
                result: Arc::clone(&result),
                cached_at: now,
            },
        );
        Ok(result)
    }

    /// Number of entries held, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds nothing.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn lookup(&self, key: &str) -> Option<Arc<ScrapeResult>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl, Instant::now()))
            .map(|entry| Arc::clone(&entry.result))
    }
}
