//! Operator notifications.
//!
//! Failures found while checking links are reported as plain text through a
//! [`Notifier`]. The [`TelegramNotifier`] sends them to a fixed chat through
//! the Telegram bot API. Delivery problems are logged and returned as
//! [`Delivery::Failed`]; they never abort a run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::TelegramConfig;
use crate::error::error_chain;

/// Outcome of a single notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    Failed { reason: String },
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Delivery;
}

/// Sends messages with `GET {api_base}/bot{token}/sendMessage`.
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn from_config(config: TelegramConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("streamwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");
        Self::new(config, client)
    }

    /// Build the request URL. `chat_id` and `text` are percent-encoded.
    fn send_url(&self, token: &str, chat_id: &str, message: &str) -> Result<Url, String> {
        let base = format!("{}/bot{}/sendMessage", self.config.api_base, token);
        let mut url = Url::parse(&base).map_err(|e| format!("Invalid Telegram API URL: {}", e))?;
        url.query_pairs_mut()
            .append_pair("chat_id", chat_id)
            .append_pair("text", message);
        Ok(url)
    }

    async fn deliver(&self, message: &str) -> Result<(), String> {
        let token = self
            .config
            .bot_token
            .as_deref()
            .ok_or_else(|| format!("{} is not set", crate::config::BOT_TOKEN_ENV))?;
        let chat_id = self
            .config
            .chat_id
            .as_deref()
            .ok_or_else(|| format!("{} is not set", crate::config::CHAT_ID_ENV))?;

        let url = self.send_url(token, chat_id, message)?;

        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(format!("Telegram API returned HTTP {}", resp.status())),
            // reqwest errors embed the URL, which carries the token.
            Err(e) => Err(format!(
                "Request to Telegram API failed: {}",
                error_chain(&e.without_url())
            )),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Delivery {
        match self.deliver(message).await {
            Ok(()) => {
                debug!("Notification sent");
                Delivery::Sent
            }
            Err(reason) => {
                warn!(error = %reason, "Notification delivery failed");
                Delivery::Failed { reason }
            }
        }
    }
}
