use crate::actions::{
    extract_domain, BrowserActions, Key, NetworkEvent, NetworkEventStream, RequestId, ResponseBody,
};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams,
    RequestId as CdpRequestId, SetUserAgentOverrideParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::stream::StreamExt;
use jobtap_core::BrowserConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// How often `find_element` is retried while waiting for a selector.
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wait applied by interaction methods that locate their element implicitly.
const INTERACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Browser automation engine: one browser, one page.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    fingerprint: FingerprintConfig,
}

impl BrowserEngine {
    /// Launch a browser with default configuration
    pub async fn new() -> Result<Self> {
        Self::launch(&BrowserConfig::default()).await
    }

    /// Launch a browser, open a blank page, apply the fingerprint and
    /// enable the network domain so response events flow.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let fingerprint = FingerprintConfig::from_config(config);

        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .args(fingerprint.launch_args.iter().map(String::as_str));
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;

        tracing::info!(
            "Launching browser (headless: {}, binary: {})",
            config.headless,
            config
                .chrome_path
                .as_ref()
                .map_or_else(|| "auto-detected".to_string(), |p| p.display().to_string())
        );

        let (browser, mut handler) = Browser::launch(chrome_config).await?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("Browser handler event error: {}", e);
                }
            }
            tracing::debug!("Browser handler finished");
        });

        let page = browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
            .await?;
        page.execute(EnableParams::default()).await?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            fingerprint,
        })
    }

    /// User agent in effect for this browser.
    pub fn user_agent(&self) -> &str {
        &self.fingerprint.user_agent
    }

    /// Close the browser and stop the handler task.
    pub async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await;
        self.handler.abort();
        closed.map(|_| ()).map_err(BrowserError::from)
    }

    async fn find(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if tokio::time::Instant::now() >= deadline => {
                    tracing::debug!("Selector {} not found: {}", selector, e);
                    return Err(BrowserError::ElementNotFound {
                        selector: selector.to_string(),
                        waited: timeout,
                    });
                }
                Err(_) => tokio::time::sleep(ELEMENT_POLL_INTERVAL).await,
            }
        }
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        let domain = extract_domain(url)?;
        tracing::info!("Navigating to {}", domain);
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| BrowserError::EvaluationError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.find(selector, timeout).await.map(|_| ())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self.find(selector, INTERACTION_TIMEOUT).await?;
        element.click().await?;
        Ok(())
    }

    async fn select_all_text(&self, selector: &str) -> Result<()> {
        let element = self.find(selector, INTERACTION_TIMEOUT).await?;
        element
            .call_js_fn(
                "function() { this.focus(); if (typeof this.select === 'function') { this.select(); } }",
                false,
            )
            .await?;
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: Key) -> Result<()> {
        let element = self.find(selector, INTERACTION_TIMEOUT).await?;
        element.press_key(key.name()).await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.find(selector, INTERACTION_TIMEOUT).await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn network_events(&self) -> Result<NetworkEventStream> {
        let received = self
            .page
            .event_listener::<EventResponseReceived>()
            .await?
            .map(|event| NetworkEvent::ResponseReceived {
                request_id: RequestId::new(event.request_id.inner().clone()),
                url: event.response.url.clone(),
                status: event.response.status,
            });

        let finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|event| NetworkEvent::LoadingFinished {
                request_id: RequestId::new(event.request_id.inner().clone()),
            });

        Ok(futures::stream::select(received, finished).boxed())
    }

    async fn response_body(&self, request_id: &RequestId) -> Result<ResponseBody> {
        let params = GetResponseBodyParams::new(CdpRequestId::new(request_id.as_str()));
        let response =
            self.page
                .execute(params)
                .await
                .map_err(|e| BrowserError::BodyUnavailable {
                    request_id: request_id.to_string(),
                    reason: e.to_string(),
                })?;

        let returns = response.result;
        Ok(ResponseBody {
            body: returns.body,
            base64_encoded: returns.base64_encoded,
        })
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
