//! Error types for scrape operations.

use jobtap_core::SessionState;
use std::time::Duration;
use thiserror::Error;

/// Longest body prefix kept in a [`DecodeError`].
pub const PREVIEW_LIMIT: usize = 200;

/// Errors surfaced to callers of a scrape operation.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Operation attempted while the session is not `ready`
    #[error("session not ready (state: {state})")]
    NotReady {
        /// State the session was in
        state: SessionState,
    },

    /// Anti-automation challenge never cleared during startup
    #[error("challenge not solved after {attempts} attempts")]
    ChallengeUnsolved {
        /// Title polls performed
        attempts: u32,
    },

    /// No capture arrived within the bound for this phase
    #[error("timed out after {waited:?} waiting for {phase}")]
    Timeout {
        /// What was being waited for
        phase: &'static str,
        /// The bound that elapsed
        waited: Duration,
    },

    /// None of the search input selectors matched
    #[error("search input not found (tried {selectors:?})")]
    ElementNotFound {
        /// Selectors attempted, in order
        selectors: Vec<String>,
    },

    /// Browser automation failure
    #[error("browser error: {0}")]
    Browser(#[from] jobtap_browser::BrowserError),
}

/// A response body matched none of the known envelope shapes.
///
/// Returned by [`extract_records`](crate::extract_records). Capture logs and
/// skips such bodies, so it never reaches a session caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not extract records from body: {preview}")]
pub struct DecodeError {
    /// Leading part of the offending body
    pub preview: String,
}

impl DecodeError {
    /// Build an error carrying at most [`PREVIEW_LIMIT`] bytes of `body`,
    /// cut on a character boundary.
    #[must_use]
    pub fn new(body: &str) -> Self {
        let mut end = body.len().min(PREVIEW_LIMIT);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            preview: body[..end].to_string(),
        }
    }
}

/// Result type alias using `ScrapeError`.
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_is_bounded() {
        let body = "x".repeat(1000);
        assert_eq!(DecodeError::new(&body).preview.len(), PREVIEW_LIMIT);
        assert_eq!(DecodeError::new("short").preview, "short");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        // 'é' is two bytes, so byte 200 falls inside a character
        let body = format!("a{}", "é".repeat(150));
        let preview = DecodeError::new(&body).preview;
        assert!(preview.len() <= PREVIEW_LIMIT);
        assert!(preview.starts_with('a'));
    }

    #[test]
    fn test_error_display() {
        let err = ScrapeError::NotReady {
            state: SessionState::Initializing,
        };
        assert_eq!(err.to_string(), "session not ready (state: initializing)");

        let err = ScrapeError::Timeout {
            phase: "first page",
            waited: Duration::from_secs(45),
        };
        assert_eq!(err.to_string(), "timed out after 45s waiting for first page");
    }
}
