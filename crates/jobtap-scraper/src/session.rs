//! Scrape session: one browser page, one operation at a time.
//!
//! A session owns the lifecycle of the page against the target site. Each
//! operation gets a fresh [`CaptureBuffer`], so a stale response from one
//! operation never leaks into the next.

use crate::capture::{CaptureBuffer, ResponseFilter};
use crate::convergence::{ConvergenceReport, ScrollController};
use crate::error::{Result, ScrapeError};
use crate::interaction::{SearchAction, SearchPage};
use jobtap_browser::{resolve_challenge, BrowserActions, BrowserError};
use jobtap_core::{AppConfig, ChallengeConfig, ScrapeResult, ScrapingConfig, SessionState, TargetConfig};
use std::sync::Arc;

/// The configuration sections a session reads.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Site, selectors and interaction pauses
    pub target: TargetConfig,
    /// Challenge polling
    pub challenge: ChallengeConfig,
    /// Waits and convergence thresholds
    pub scraping: ScrapingConfig,
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            target: config.target.clone(),
            challenge: config.challenge.clone(),
            scraping: config.scraping.clone(),
        }
    }
}

/// Result of a full scroll-to-convergence scrape.
#[derive(Debug, Clone)]
pub struct ConvergedScrape {
    /// Deduplicated listings
    pub result: ScrapeResult,
    /// How pagination went
    pub report: ConvergenceReport,
}

/// Marks the session busy for one operation and restores `Ready` on drop,
/// whether the operation succeeded, failed or was cancelled.
struct Busy<'a> {
    state: &'a mut SessionState,
}

impl<'a> Busy<'a> {
    fn enter(state: &'a mut SessionState, next: SessionState) -> Result<Self> {
        if !state.is_ready() {
            return Err(ScrapeError::NotReady { state: *state });
        }
        *state = next;
        Ok(Self { state })
    }

    fn set(&mut self, next: SessionState) {
        *self.state = next;
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::Ready;
    }
}

/// A page on the target site and the operations it supports.
pub struct ScrapeSession {
    actions: Arc<dyn BrowserActions>,
    config: SessionConfig,
    state: SessionState,
}

impl ScrapeSession {
    /// Wrap a browser page. Call [`initialize`](Self::initialize) before use.
    pub fn new(actions: Arc<dyn BrowserActions>, config: SessionConfig) -> Self {
        Self {
            actions,
            config,
            state: SessionState::Initializing,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Navigate to the site and wait out any challenge page.
    ///
    /// On failure the session moves to `Failed` and stays unusable.
    pub async fn initialize(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Initializing => {}
            state => return Err(ScrapeError::NotReady { state }),
        }

        match self.open_site().await {
            Ok(()) => {
                self.state = SessionState::Ready;
                tracing::info!("Session ready");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                tracing::error!("Session initialization failed: {}", e);
                Err(e)
            }
        }
    }

    async fn open_site(&self) -> Result<()> {
        self.actions.navigate(&self.config.target.site_url).await?;

        let title = resolve_challenge(self.actions.as_ref(), &self.config.challenge)
            .await
            .map_err(|e| match e {
                BrowserError::ChallengeUnsolved { attempts, .. } => {
                    ScrapeError::ChallengeUnsolved { attempts }
                }
                other => ScrapeError::Browser(other),
            })?;
        tracing::info!("Page loaded: {}", title);

        tokio::time::sleep(self.config.challenge.settle()).await;
        Ok(())
    }

    /// Submit `query` and return whatever the first page captured.
    ///
    /// No scrolling and no deduplication: every record from every captured
    /// body is returned.
    pub async fn search_once(&mut self, query: &str) -> Result<ScrapeResult> {
        let Self {
            actions,
            config,
            state,
        } = self;
        let _busy = Busy::enter(state, SessionState::Searching)?;

        let mut capture = attach(actions, config).await?;
        let page = SearchPage::new(actions.as_ref(), &config.target);
        page.submit(&SearchAction::from_query(query)).await?;

        let waited = config.scraping.first_page_timeout();
        if !capture.wait_for_signal(waited).await {
            return Err(ScrapeError::Timeout {
                phase: "first page",
                waited,
            });
        }
        tokio::time::sleep(config.scraping.first_page_settle()).await;

        let jobs = capture.snapshot_all();
        tracing::info!("Search {:?} captured {} listings", query, jobs.len());
        Ok(ScrapeResult::new(query, jobs))
    }

    /// Submit `query` (blank browses everything) and scroll until the result
    /// set converges or `max_scrolls` rounds run. `None` or zero uses the
    /// configured default budget.
    pub async fn scrape_all(
        &mut self,
        query: &str,
        max_scrolls: Option<u32>,
    ) -> Result<ConvergedScrape> {
        let Self {
            actions,
            config,
            state,
        } = self;
        let mut busy = Busy::enter(state, SessionState::Searching)?;
        let budget = max_scrolls
            .filter(|&max| max > 0)
            .unwrap_or(config.scraping.default_max_scrolls);

        let mut capture = attach(actions, config).await?;
        let page = SearchPage::new(actions.as_ref(), &config.target);
        let mut controller = ScrollController::new(page, &mut capture, &config.scraping);

        controller.first_page(&SearchAction::from_query(query)).await?;
        busy.set(SessionState::Scrolling);
        controller.paginate(budget).await;
        busy.set(SessionState::Converged);

        let (jobs, report) = controller.finish();
        tracing::info!(
            "Scrape {:?} finished: {} unique listings in {} rounds ({:?})",
            query,
            report.unique,
            report.rounds,
            report.termination
        );
        Ok(ConvergedScrape {
            result: ScrapeResult::new(query, jobs),
            report,
        })
    }
}

/// Fresh capture buffer, given a moment to start listening before the
/// action that triggers traffic.
async fn attach(actions: &Arc<dyn BrowserActions>, config: &SessionConfig) -> Result<CaptureBuffer> {
    let capture = CaptureBuffer::attach(
        Arc::clone(actions),
        ResponseFilter::from_target(&config.target),
        &config.scraping,
    )
    .await?;
    tokio::time::sleep(config.scraping.listener_settle()).await;
    Ok(capture)
}
