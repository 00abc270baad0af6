//! Anti-automation challenge resolution.
//!
//! Interstitial pages ("Vercel Security Checkpoint" and friends) resolve on
//! their own after running some script; all we can do is poll the document
//! title until it stops looking like one.

use crate::actions::BrowserActions;
use crate::error::{BrowserError, Result};
use jobtap_core::ChallengeConfig;

/// Poll the page title until the challenge clears.
///
/// Returns the final title. Fails with `ChallengeUnsolved` once
/// `config.max_attempts` polls have all seen an empty or challenge title.
/// Title read errors count as a failed attempt rather than aborting.
pub async fn resolve_challenge(
    actions: &dyn BrowserActions,
    config: &ChallengeConfig,
) -> Result<String> {
    let mut last_title = None;

    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.poll_interval()).await;

        match actions.title().await {
            Ok(title) if is_cleared(&title, &config.markers) => {
                tracing::info!("Challenge cleared after {} attempt(s): {}", attempt, title);
                return Ok(title);
            }
            Ok(title) => {
                tracing::debug!("Challenge attempt {}/{}: {:?}", attempt, config.max_attempts, title);
                last_title = Some(title);
            }
            Err(e) => {
                tracing::debug!("Title read failed on attempt {}: {}", attempt, e);
            }
        }
    }

    Err(BrowserError::ChallengeUnsolved {
        attempts: config.max_attempts,
        last_title,
    })
}

fn is_cleared(title: &str, markers: &[String]) -> bool {
    if title.is_empty() {
        return false;
    }
    let lower = title.to_lowercase();
    !markers
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}
