mod http;

pub use http::HttpChecker;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::notify::Notifier;

/// Failure to get any HTTP response. The display text carries the full
/// cause chain but not the URL, which callers add themselves.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("timed out: {reason}")]
    Timeout { url: String, reason: String },
    #[error("{reason}")]
    Network { url: String, reason: String },
}

impl CheckError {
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Network { url, .. } => url,
        }
    }
}

/// Lightweight reachability test for a stream URL.
///
/// Any HTTP response counts as a result, whatever its status; only failures
/// to get a response at all are errors.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    async fn fetch_status(&self, url: &str) -> Result<u16, CheckError>;
}

/// Check `url` once. Network failures are reported to the operator and
/// yield `None`.
pub async fn check_liveness(
    checker: &dyn LivenessCheck,
    notifier: &dyn Notifier,
    url: &str,
) -> Option<u16> {
    match checker.fetch_status(url).await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(url, error = %e, "Liveness check failed");
            notifier
                .send(&format!("Error while checking link {}: {}", url, e))
                .await;
            None
        }
    }
}
