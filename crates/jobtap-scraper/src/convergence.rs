//! Scroll pagination until the result set stops growing.
//!
//! A round is one scroll plus a bounded wait for captures. The site gives no
//! "last page" marker, so pagination ends after a number of consecutive
//! rounds that add no new identifiers, or when the scroll budget runs out.

use crate::accumulator::Accumulator;
use crate::capture::{CaptureBuffer, CaptureCursor};
use crate::error::{Result, ScrapeError};
use crate::interaction::{SearchAction, SearchPage};
use jobtap_core::{JobRecord, ScrapingConfig};

/// Where the controller is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing submitted yet
    Idle,
    /// Search submitted, waiting for the first page
    Searched,
    /// First page captured and merged
    FirstPageReceived,
    /// Scroll issued, waiting for captures
    Scrolling,
    /// Merging the round's captures
    Draining,
    /// Stopped: enough empty rounds or the budget ran out
    Converged,
    /// The first page never arrived
    TimedOut,
}

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Consecutive empty rounds reached the limit
    Converged,
    /// The scroll budget ran out while rounds were still adding records
    BudgetExhausted,
}

/// Summary of one pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// Scroll rounds performed
    pub rounds: u32,
    /// Distinct identifiers collected
    pub unique: usize,
    /// Records dropped for lack of an identifier
    pub unidentified: usize,
    /// Accumulated size after the first page, then after each round
    pub totals: Vec<usize>,
    /// Why the run stopped
    pub termination: Termination,
}

/// Runs the search, first-page wait and scroll rounds over one capture buffer.
pub struct ScrollController<'a> {
    page: SearchPage<'a>,
    capture: &'a mut CaptureBuffer,
    config: &'a ScrapingConfig,
    state: ControllerState,
    accumulator: Accumulator,
    cursor: CaptureCursor,
    totals: Vec<usize>,
    rounds: u32,
    termination: Termination,
}

impl<'a> ScrollController<'a> {
    /// Create an idle controller.
    pub fn new(
        page: SearchPage<'a>,
        capture: &'a mut CaptureBuffer,
        config: &'a ScrapingConfig,
    ) -> Self {
        Self {
            page,
            capture,
            config,
            state: ControllerState::Idle,
            accumulator: Accumulator::new(),
            cursor: CaptureCursor::default(),
            totals: Vec::new(),
            rounds: 0,
            termination: Termination::BudgetExhausted,
        }
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Submit the search and merge the first page.
    ///
    /// Fails with `Timeout` when no capture arrives within the first-page
    /// bound; nothing accumulated so far is returned in that case.
    pub async fn first_page(&mut self, action: &SearchAction) -> Result<usize> {
        self.page.submit(action).await?;
        self.state = ControllerState::Searched;

        let waited = self.config.first_page_timeout();
        if !self.capture.wait_for_signal(waited).await {
            self.state = ControllerState::TimedOut;
            return Err(ScrapeError::Timeout {
                phase: "first page",
                waited,
            });
        }

        tokio::time::sleep(self.config.first_page_settle()).await;
        self.drain();
        self.state = ControllerState::FirstPageReceived;

        let total = self.accumulator.len();
        self.totals.push(total);
        tracing::info!("Page 0: {} unique listings", total);
        Ok(total)
    }

    /// Scroll until `empty_round_limit` consecutive rounds add nothing, or
    /// `max_scrolls` rounds have run.
    pub async fn paginate(&mut self, max_scrolls: u32) -> u32 {
        let limit = self.config.empty_round_limit.max(1);
        let mut empty_streak = 0;
        let mut rounds = 0;

        while rounds < max_scrolls {
            rounds += 1;
            self.state = ControllerState::Scrolling;
            let before = self.accumulator.len();

            // stale wake-ups from the previous round would end this wait early
            self.capture.clear_signals();
            if let Err(e) = self.page.scroll_to_bottom().await {
                tracing::debug!("Scroll {} failed: {}", rounds, e);
            }

            if self.capture.wait_for_signal(self.config.round_timeout()).await {
                tokio::time::sleep(self.config.round_settle()).await;
            }

            self.state = ControllerState::Draining;
            self.drain();
            let total = self.accumulator.len();
            self.totals.push(total);
            let added = total - before;
            tracing::info!("Scroll {}: +{} new (total: {} unique)", rounds, added, total);

            if added == 0 {
                empty_streak += 1;
                if empty_streak >= limit {
                    tracing::info!("No new listings after {} rounds, stopping", empty_streak);
                    self.termination = Termination::Converged;
                    break;
                }
            } else {
                empty_streak = 0;
            }

            tokio::time::sleep(self.config.round_delay()).await;
        }

        self.state = ControllerState::Converged;
        self.rounds = rounds;
        rounds
    }

    /// Full run: search, first page, then paginate.
    pub async fn run(
        mut self,
        action: &SearchAction,
        max_scrolls: u32,
    ) -> Result<(Vec<JobRecord>, ConvergenceReport)> {
        self.first_page(action).await?;
        self.paginate(max_scrolls).await;
        Ok(self.finish())
    }

    /// Consume into the deduplicated records and a report.
    pub fn finish(self) -> (Vec<JobRecord>, ConvergenceReport) {
        let report = ConvergenceReport {
            rounds: self.rounds,
            unique: self.accumulator.len(),
            unidentified: self.accumulator.unidentified(),
            totals: self.totals,
            termination: self.termination,
        };
        (self.accumulator.finalize(), report)
    }

    fn drain(&mut self) {
        let records = self.capture.snapshot_new_since(&mut self.cursor);
        let outcome = self.accumulator.merge(records);
        if outcome.unidentified > 0 {
            tracing::debug!("Dropped {} listings without an id", outcome.unidentified);
        }
    }
}
