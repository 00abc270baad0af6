use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("element not found: {selector} (waited {waited:?})")]
    ElementNotFound { selector: String, waited: Duration },

    #[error("script evaluation failed: {0}")]
    EvaluationError(String),

    #[error("response body unavailable for request {request_id}: {reason}")]
    BodyUnavailable { request_id: String, reason: String },

    #[error("challenge not solved after {attempts} attempts (last title: {last_title:?})")]
    ChallengeUnsolved {
        attempts: u32,
        last_title: Option<String>,
    },

    #[error("timeout: {0}")]
    Timeout(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::ChromiumError(err.to_string())
    }
}
