#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use jobtap_browser::{
    BrowserActions, BrowserError, Key, NetworkEvent, NetworkEventStream, RequestId, ResponseBody,
    Result,
};
use jobtap_scraper::{ScrapeSession, SessionConfig};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const SEARCH_URL: &str = "https://hiring.cafe/api/search-jobs?s=eyJx";
pub const COUNT_URL: &str = "https://hiring.cafe/api/search-jobs/get-total-count?s=eyJx";
pub const ASSET_URL: &str = "https://hiring.cafe/_next/static/chunks/app.js";

/// One response the mock site emits when triggered.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub url: String,
    pub status: i64,
    /// `None` makes the body fetch fail
    pub body: Option<ResponseBody>,
    /// Emit `LoadingFinished` before `ResponseReceived`
    pub finish_first: bool,
}

impl MockResponse {
    pub fn search(body: impl Into<String>) -> Self {
        Self {
            url: SEARCH_URL.to_string(),
            status: 200,
            body: Some(ResponseBody {
                body: body.into(),
                base64_encoded: false,
            }),
            finish_first: false,
        }
    }

    /// A `{"results": [...]}` page of listings with the given ids.
    pub fn page(ids: &[&str]) -> Self {
        let results: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": id, "title": format!("Job {id}")}))
            .collect();
        Self::search(json!({ "results": results }).to_string())
    }

    /// A page of arbitrary listing objects.
    pub fn records(records: Vec<Value>) -> Self {
        Self::search(json!({ "results": records }).to_string())
    }

    pub fn count() -> Self {
        Self {
            url: COUNT_URL.to_string(),
            ..Self::search(r#"{"total":999}"#)
        }
    }

    pub fn asset() -> Self {
        Self {
            url: ASSET_URL.to_string(),
            ..Self::search("console.log(1)")
        }
    }

    pub fn with_status(mut self, status: i64) -> Self {
        self.status = status;
        self
    }

    pub fn failing() -> Self {
        Self {
            body: None,
            ..Self::page(&["never"])
        }
    }

    pub fn transport_base64(mut self) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.body = STANDARD.encode(&body.body);
            body.base64_encoded = true;
        }
        self
    }

    pub fn finishing_first(mut self) -> Self {
        self.finish_first = true;
        self
    }
}

#[derive(Default)]
struct SiteState {
    sender: Option<mpsc::UnboundedSender<NetworkEvent>>,
    on_submit: VecDeque<Vec<MockResponse>>,
    on_scroll: VecDeque<Vec<MockResponse>>,
    bodies: HashMap<String, ResponseBody>,
    next_id: u64,
    missing_selectors: Vec<String>,
    titles: VecDeque<String>,
    navigations: Vec<String>,
    typed: Vec<(String, String)>,
    submits: u32,
    scrolls: u32,
    subscriptions: u32,
    interactions: Vec<String>,
}

/// Scripted stand-in for the target site behind a browser page.
///
/// Each Enter press emits the next queued submit batch and each scroll the
/// next queued scroll batch; once a queue runs dry nothing is emitted.
pub struct MockSite {
    state: Mutex<SiteState>,
}

impl MockSite {
    pub fn new() -> Self {
        let state = SiteState {
            titles: VecDeque::from(vec!["HiringCafe".to_string()]),
            ..SiteState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn on_submit(self, responses: Vec<MockResponse>) -> Self {
        self.state.lock().unwrap().on_submit.push_back(responses);
        self
    }

    pub fn on_scroll(self, responses: Vec<MockResponse>) -> Self {
        self.state.lock().unwrap().on_scroll.push_back(responses);
        self
    }

    pub fn without_selector(self, selector: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .missing_selectors
            .push(selector.to_string());
        self
    }

    /// Titles served in order; the last one repeats.
    pub fn with_titles(self, titles: &[&str]) -> Self {
        self.state.lock().unwrap().titles = titles.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Emit responses to the current subscriber right away.
    pub fn emit(&self, responses: Vec<MockResponse>) {
        let mut state = self.state.lock().unwrap();
        for response in responses {
            state.next_id += 1;
            let request_id = RequestId::new(format!("req-{}", state.next_id));
            if let Some(body) = response.body {
                state.bodies.insert(request_id.as_str().to_string(), body);
            }

            let received = NetworkEvent::ResponseReceived {
                request_id: request_id.clone(),
                url: response.url,
                status: response.status,
            };
            let finished = NetworkEvent::LoadingFinished { request_id };
            let ordered = if response.finish_first {
                [finished, received]
            } else {
                [received, finished]
            };

            if let Some(sender) = &state.sender {
                for event in ordered {
                    let _ = sender.send(event);
                }
            }
        }
    }

    pub fn submits(&self) -> u32 {
        self.state.lock().unwrap().submits
    }

    pub fn scrolls(&self) -> u32 {
        self.state.lock().unwrap().scrolls
    }

    /// Subscribe, type and Enter calls in the order they happened.
    pub fn interactions(&self) -> Vec<String> {
        self.state.lock().unwrap().interactions.clone()
    }

    pub fn subscriptions(&self) -> u32 {
        self.state.lock().unwrap().subscriptions
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }
}

#[async_trait::async_trait]
impl BrowserActions for MockSite {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.state.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        if expression.contains("scrollTo") {
            let batch = {
                let mut state = self.state.lock().unwrap();
                state.scrolls += 1;
                state.on_scroll.pop_front()
            };
            if let Some(batch) = batch {
                self.emit(batch);
            }
        }
        Ok(Value::Null)
    }

    async fn title(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.titles.len() > 1 {
            Ok(state.titles.pop_front().unwrap())
        } else {
            Ok(state.titles.front().cloned().unwrap_or_default())
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let missing = self
            .state
            .lock()
            .unwrap()
            .missing_selectors
            .iter()
            .any(|s| s == selector);
        if missing {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                waited: timeout,
            });
        }
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn select_all_text(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn press_key(&self, _selector: &str, key: Key) -> Result<()> {
        if key != Key::Enter {
            return Ok(());
        }
        let batch = {
            let mut state = self.state.lock().unwrap();
            state.submits += 1;
            state.interactions.push("enter".to_string());
            state.on_submit.pop_front()
        };
        if let Some(batch) = batch {
            self.emit(batch);
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.interactions.push(format!("type {text}"));
        state.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn network_events(&self) -> Result<NetworkEventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.state.lock().unwrap();
            state.sender = Some(tx);
            state.subscriptions += 1;
            state.interactions.push("subscribe".to_string());
        }
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn response_body(&self, request_id: &RequestId) -> Result<ResponseBody> {
        self.state
            .lock()
            .unwrap()
            .bodies
            .get(request_id.as_str())
            .cloned()
            .ok_or_else(|| BrowserError::BodyUnavailable {
                request_id: request_id.to_string(),
                reason: "No resource with given identifier found".to_string(),
            })
    }
}

/// A session over `site` that has already cleared initialization.
pub async fn ready_session(site: &Arc<MockSite>) -> ScrapeSession {
    let actions: Arc<dyn BrowserActions> = site.clone();
    let mut session = ScrapeSession::new(actions, SessionConfig::default());
    session.initialize().await.expect("initialize");
    session
}

/// Ids of `records`, sorted.
pub fn sorted_ids(records: &[jobtap_core::JobRecord]) -> Vec<String> {
    let mut ids: Vec<String> = records
        .iter()
        .filter_map(|r| r.id().map(|id| id.as_str().to_string()))
        .collect();
    ids.sort();
    ids
}
