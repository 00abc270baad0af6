//! Capture of search-API response bodies from the page's network feed.
//!
//! The browser reports a response in two steps: headers first, body
//! completion later. A background listener pairs the two by request id,
//! fetches the body once it is complete and appends it to an append-only
//! log. Every append sends a best-effort wake-up on a bounded channel.
//!
//! Wake-ups are edge hints only. A full channel drops them, so consumers
//! re-read the log through a [`CaptureCursor`] instead of counting signals.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::StreamExt;
use jobtap_browser::{redact_url, BrowserActions, NetworkEvent, NetworkEventStream, RequestId, ResponseBody};
use jobtap_core::{JobRecord, ScrapingConfig, TargetConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::Result;
use crate::extractor::extract_records;

/// Decides which responses are search results worth capturing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFilter {
    path_segment: String,
    excluded_segment: String,
}

impl ResponseFilter {
    /// Filter matching URLs that contain `path_segment` but not
    /// `excluded_segment`.
    pub fn new(path_segment: impl Into<String>, excluded_segment: impl Into<String>) -> Self {
        Self {
            path_segment: path_segment.into(),
            excluded_segment: excluded_segment.into(),
        }
    }

    /// Filter for the configured target site.
    #[must_use]
    pub fn from_target(target: &TargetConfig) -> Self {
        Self::new(&target.api_path_segment, &target.excluded_path_segment)
    }

    /// Only successful search responses qualify; count queries do not.
    #[must_use]
    pub fn matches(&self, url: &str, status: i64) -> bool {
        status == 200
            && url.contains(&self.path_segment)
            && (self.excluded_segment.is_empty() || !url.contains(&self.excluded_segment))
    }
}

/// Position in the capture log up to which bodies have been consumed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCursor(usize);

impl CaptureCursor {
    /// Number of bodies consumed so far.
    #[must_use]
    pub fn position(self) -> usize {
        self.0
    }
}

/// Request ids waiting for their second event, bounded in age and count.
#[derive(Debug)]
struct RequestTable<V> {
    entries: HashMap<RequestId, (V, Instant)>,
    ttl: Duration,
    capacity: usize,
}

impl<V> RequestTable<V> {
    fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, id: RequestId, value: V) {
        let now = Instant::now();
        self.prune(now);
        if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, seen))| *seen)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Evicting unpaired request {}", oldest);
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(id, (value, now));
    }

    fn remove(&mut self, id: &RequestId) -> Option<V> {
        self.entries.remove(id).map(|(value, _)| value)
    }

    fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, seen)| now.saturating_duration_since(*seen) < ttl);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// State shared between the listener task and the consumer.
#[derive(Debug)]
struct CaptureLog {
    /// Matching responses whose body is not complete yet, keyed to their URL
    pending: RequestTable<String>,
    /// Completions that arrived before their response event
    finished_early: RequestTable<()>,
    bodies: Vec<String>,
}

impl CaptureLog {
    fn new(config: &ScrapingConfig) -> Self {
        Self {
            pending: RequestTable::new(config.pending_ttl(), config.max_pending),
            finished_early: RequestTable::new(config.pending_ttl(), config.max_pending),
            bodies: Vec::new(),
        }
    }

    /// Record a matching response. Returns true when its body is already
    /// complete and should be fetched right away.
    fn track(&mut self, id: RequestId, url: String) -> bool {
        if self.finished_early.remove(&id).is_some() {
            return true;
        }
        self.pending.insert(id, url);
        false
    }

    /// Record a completion. Returns the URL when it pairs with a tracked
    /// response.
    fn complete(&mut self, id: &RequestId) -> Option<String> {
        if let Some(url) = self.pending.remove(id) {
            return Some(url);
        }
        self.finished_early.insert(id.clone(), ());
        None
    }
}

fn lock(shared: &Mutex<CaptureLog>) -> MutexGuard<'_, CaptureLog> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-operation capture of search responses.
///
/// Attaching subscribes to the page's network events and starts a listener
/// task; dropping the buffer stops the task and discards unpaired requests.
#[derive(Debug)]
pub struct CaptureBuffer {
    shared: Arc<Mutex<CaptureLog>>,
    signal: mpsc::Receiver<()>,
    listener: JoinHandle<()>,
}

impl CaptureBuffer {
    /// Subscribe to `actions`' network events and start capturing.
    pub async fn attach(
        actions: Arc<dyn BrowserActions>,
        filter: ResponseFilter,
        config: &ScrapingConfig,
    ) -> Result<Self> {
        let events = actions.network_events().await?;
        let (tx, rx) = mpsc::channel(config.signal_capacity.max(1));
        let shared = Arc::new(Mutex::new(CaptureLog::new(config)));

        let listener = tokio::spawn(listen(events, actions, filter, Arc::clone(&shared), tx));

        Ok(Self {
            shared,
            signal: rx,
            listener,
        })
    }

    /// Wait up to `timeout` for a wake-up. True if one arrived.
    ///
    /// A true result only means at least one body was appended since some
    /// earlier point; read the log to find out what is new.
    pub async fn wait_for_signal(&mut self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.signal.recv()).await,
            Ok(Some(()))
        )
    }

    /// Discard wake-ups already queued. Bodies stay in the log.
    pub fn clear_signals(&mut self) -> usize {
        let mut cleared = 0;
        while self.signal.try_recv().is_ok() {
            cleared += 1;
        }
        cleared
    }

    /// Decode every body appended after `cursor`, then advance it.
    ///
    /// Only the raw bodies are copied under the lock; decoding happens
    /// outside it. Bodies that fail to decode are logged and skipped.
    pub fn snapshot_new_since(&self, cursor: &mut CaptureCursor) -> Vec<JobRecord> {
        let bodies = {
            let log = lock(&self.shared);
            let start = cursor.0.min(log.bodies.len());
            cursor.0 = log.bodies.len();
            log.bodies[start..].to_vec()
        };

        let mut records = Vec::new();
        for body in &bodies {
            match extract_records(body) {
                Ok(decoded) => records.extend(decoded),
                Err(e) => tracing::warn!("Skipping undecodable body: {}", e),
            }
        }
        records
    }

    /// Decode every body captured so far.
    pub fn snapshot_all(&self) -> Vec<JobRecord> {
        self.snapshot_new_since(&mut CaptureCursor::default())
    }

    /// Number of bodies captured so far.
    pub fn body_count(&self) -> usize {
        lock(&self.shared).bodies.len()
    }

    /// Number of matching responses still waiting for their body.
    pub fn pending_count(&self) -> usize {
        lock(&self.shared).pending.len()
    }
}

impl Drop for CaptureBuffer {
    fn drop(&mut self) {
        self.listener.abort();
        let mut log = lock(&self.shared);
        log.pending.clear();
        log.finished_early.clear();
    }
}

async fn listen(
    mut events: NetworkEventStream,
    actions: Arc<dyn BrowserActions>,
    filter: ResponseFilter,
    shared: Arc<Mutex<CaptureLog>>,
    signal: mpsc::Sender<()>,
) {
    while let Some(event) = events.next().await {
        let ready = match event {
            NetworkEvent::ResponseReceived {
                request_id,
                url,
                status,
            } => {
                if !filter.matches(&url, status) {
                    continue;
                }
                tracing::debug!("Tracking {} ({})", redact_url(&url), request_id);
                let complete = lock(&shared).track(request_id.clone(), url.clone());
                complete.then_some((request_id, url))
            }
            NetworkEvent::LoadingFinished { request_id } => {
                let url = lock(&shared).complete(&request_id);
                url.map(|url| (request_id, url))
            }
        };

        if let Some((request_id, url)) = ready {
            capture_body(actions.as_ref(), &shared, &signal, &request_id, &url).await;
        }
    }
    tracing::debug!("Network event stream closed");
}

async fn capture_body(
    actions: &dyn BrowserActions,
    shared: &Mutex<CaptureLog>,
    signal: &mpsc::Sender<()>,
    request_id: &RequestId,
    url: &str,
) {
    match actions.response_body(request_id).await {
        Ok(body) => {
            let text = body_text(body);
            tracing::info!("Captured {} ({} bytes)", redact_url(url), text.len());
            lock(shared).bodies.push(text);
            // a full channel already holds a pending wake-up
            let _ = signal.try_send(());
        }
        Err(e) => {
            tracing::warn!("Dropping response {}: {}", redact_url(url), e);
        }
    }
}

/// Undo the transport encoding the browser applied to a body.
fn body_text(body: ResponseBody) -> String {
    if !body.base64_encoded {
        return body.body;
    }
    match STANDARD.decode(body.body.trim()).map(String::from_utf8) {
        Ok(Ok(text)) => text,
        _ => {
            tracing::debug!("Body flagged base64 but not decodable; keeping raw text");
            body.body
        }
    }
}
