//! Multi-query collection for the `sync` command.

use jobtap_core::{JobRecord, SyncConfig};
use jobtap_scraper::{Accumulator, ScrapeError, ScrapeSession};
use tracing::{info, warn};

/// Split a comma-separated query list, trimming entries and dropping empties.
pub fn parse_queries(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(String::from)
        .collect()
}

/// Listings gathered across every query of one sync run.
#[derive(Debug, Default)]
pub struct Collected {
    /// Unique listings across all queries
    pub records: Vec<JobRecord>,
    /// Queries that failed and were skipped
    pub failed: Vec<String>,
    /// Records dropped for lack of an identifier
    pub unidentified: usize,
}

/// Scrape every query to convergence and deduplicate across them.
///
/// An empty query list browses the whole site in one pass, and its failure
/// is returned. With explicit queries a failed query is logged and skipped.
pub async fn collect(
    session: &mut ScrapeSession,
    queries: &[String],
    config: &SyncConfig,
) -> Result<Collected, ScrapeError> {
    if queries.is_empty() {
        info!("No queries given, browsing all listings");
        let scrape = session
            .scrape_all("", Some(config.browse_all_max_scrolls))
            .await?;
        return Ok(Collected {
            unidentified: scrape.report.unidentified,
            records: scrape.result.jobs,
            failed: Vec::new(),
        });
    }

    let mut accumulator = Accumulator::new();
    let mut failed = Vec::new();
    let mut unidentified = 0;

    for (i, query) in queries.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(config.query_delay()).await;
        }

        info!("[{}/{}] Scraping {:?}", i + 1, queries.len(), query);
        match session
            .scrape_all(query, Some(config.per_query_max_scrolls))
            .await
        {
            Ok(scrape) => {
                unidentified += scrape.report.unidentified;
                let outcome = accumulator.merge(scrape.result.jobs);
                info!(
                    "Query {:?}: {} new, {} already seen, running total {}",
                    query,
                    outcome.added,
                    outcome.replaced,
                    accumulator.len()
                );
            }
            Err(e) => {
                warn!("Query {:?} failed, continuing: {}", query, e);
                failed.push(query.clone());
            }
        }
    }

    Ok(Collected {
        records: accumulator.finalize(),
        failed,
        unidentified,
    })
}
