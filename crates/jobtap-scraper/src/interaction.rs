//! Driving the search UI: locating the input, submitting, scrolling.

use crate::error::{Result, ScrapeError};
use jobtap_browser::{BrowserActions, Key};
use jobtap_core::TargetConfig;

/// Script that scrolls the results list to the bottom, triggering the next page.
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// What to submit in the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    /// Type a query and submit it
    Query(String),
    /// Submit an empty search box, listing everything
    BrowseAll,
}

impl SearchAction {
    /// Blank queries browse everything.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() {
            Self::BrowseAll
        } else {
            Self::Query(query.to_string())
        }
    }
}

/// The search page of the target site.
pub struct SearchPage<'a> {
    actions: &'a dyn BrowserActions,
    target: &'a TargetConfig,
}

impl<'a> SearchPage<'a> {
    /// Bind to a page already navigated to the target site.
    pub fn new(actions: &'a dyn BrowserActions, target: &'a TargetConfig) -> Self {
        Self { actions, target }
    }

    /// Clear the search input, enter the action's text and press Enter.
    pub async fn submit(&self, action: &SearchAction) -> Result<()> {
        let input = self.locate_input().await?;
        self.clear(input).await?;

        match action {
            SearchAction::Query(query) => {
                tracing::info!("Searching for {:?}", query);
                self.actions.type_text(input, query).await?;
                tokio::time::sleep(self.target.typing_pause()).await;
            }
            SearchAction::BrowseAll => tracing::info!("Browsing all listings"),
        }

        self.actions.press_key(input, Key::Enter).await?;
        Ok(())
    }

    /// Scroll to the bottom of the results.
    pub async fn scroll_to_bottom(&self) -> Result<()> {
        self.actions.evaluate(SCROLL_TO_BOTTOM).await?;
        Ok(())
    }

    /// First selector that resolves. The primary one gets a longer wait.
    async fn locate_input(&self) -> Result<&'a str> {
        for (index, selector) in self.target.search_selectors.iter().enumerate() {
            let timeout = if index == 0 {
                self.target.primary_selector_timeout()
            } else {
                self.target.fallback_selector_timeout()
            };
            match self.actions.wait_for_selector(selector, timeout).await {
                Ok(()) => return Ok(selector.as_str()),
                Err(e) => tracing::debug!("Search input {} unavailable: {}", selector, e),
            }
        }

        Err(ScrapeError::ElementNotFound {
            selectors: self.target.search_selectors.clone(),
        })
    }

    async fn clear(&self, input: &str) -> Result<()> {
        let pause = self.target.input_pause();
        self.actions.click(input).await?;
        tokio::time::sleep(pause).await;
        self.actions.select_all_text(input).await?;
        self.actions.press_key(input, Key::Backspace).await?;
        tokio::time::sleep(pause).await;
        Ok(())
    }
}
