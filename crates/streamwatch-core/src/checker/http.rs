use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{CheckError, LivenessCheck};
use crate::error::error_chain;

/// HEAD-request checker with a fixed timeout.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    client: Client,
}

impl HttpChecker {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(Self::build_client(timeout))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &crate::config::MonitorConfig) -> Self {
        Self::new(config.request_timeout)
    }

    /// Redirects are not followed: a 3xx answer is reported as-is.
    pub fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("streamwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client")
    }
}

impl Default for HttpChecker {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl LivenessCheck for HttpChecker {
    async fn fetch_status(&self, url: &str) -> Result<u16, CheckError> {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(url, status, "Liveness check answered");
                Ok(status)
            }
            // The URL is stripped; `check_liveness` puts it in the message once.
            Err(e) if e.is_timeout() => Err(CheckError::Timeout {
                url: url.to_string(),
                reason: error_chain(&e.without_url()),
            }),
            Err(e) => Err(CheckError::Network {
                url: url.to_string(),
                reason: error_chain(&e.without_url()),
            }),
        }
    }
}
