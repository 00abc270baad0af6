use crate::error::{BrowserError, Result};
use futures::stream::BoxStream;
use std::fmt;
use std::time::Duration;

/// Identifier the browser assigns to an in-flight network request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network activity observed on the page, as an immutable message.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    /// Response headers arrived; the body may still be streaming.
    ResponseReceived {
        request_id: RequestId,
        url: String,
        status: i64,
    },
    /// The body is complete and can be fetched.
    LoadingFinished { request_id: RequestId },
}

/// Stream of network events for one page, independent of any consumer.
pub type NetworkEventStream = BoxStream<'static, NetworkEvent>;

/// A completed response body as handed back by the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBody {
    pub body: String,
    pub base64_encoded: bool,
}

/// Keys the scraper needs to press on the search input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
}

impl Key {
    /// DevTools key name.
    pub fn name(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Backspace => "Backspace",
        }
    }
}

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a script expression and return its JSON value (`Null` for undefined)
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value>;

    /// Current document title
    async fn title(&self) -> Result<String>;

    /// Wait for a selector to appear, failing with `ElementNotFound`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Select all text inside an input element
    async fn select_all_text(&self, selector: &str) -> Result<()>;

    /// Press a key with the element focused
    async fn press_key(&self, selector: &str, key: Key) -> Result<()>;

    /// Type text into an element
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Subscribe to response-received and loading-finished events
    async fn network_events(&self) -> Result<NetworkEventStream>;

    /// Fetch the body of a finished response
    async fn response_body(&self, request_id: &RequestId) -> Result<ResponseBody>;
}

/// Shorten a URL for logging: query strings on the search API carry a large
/// opaque search state, so only scheme, host and path are kept.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            let elided = if url.query().is_some() { "?…" } else { "" };
            format!("{}://{}{}{}", url.scheme(), host, url.path(), elided)
        }
        Err(_) => raw.chars().take(100).collect(),
    }
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}
