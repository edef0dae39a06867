use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the Telegram bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the destination chat identifier.
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHANNEL_ID";

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Settings for one pass over a playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Timeout for the HEAD liveness check (default: 5s).
    pub request_timeout: Duration,
    /// Offset into the stream at which a frame is sampled (default: 0).
    pub frame_position: Duration,
    /// Where the most recent valid frame is written. Overwritten on every capture.
    pub output_path: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            frame_position: Duration::ZERO,
            output_path: PathBuf::from("screenshot.jpg"),
        }
    }
}

impl MonitorConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_frame_position_ms(mut self, ms: u64) -> Self {
        self.frame_position = Duration::from_millis(ms);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }
}

/// Credentials and endpoint for the Telegram bot API.
///
/// Missing values are tolerated here; sending fails at call time instead.
/// Not serializable, so the token can only leave through the request URL.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_api_base(),
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: Some(bot_token.into()),
            chat_id: Some(chat_id.into()),
            api_base: default_api_base(),
        }
    }

    /// Read credentials from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHANNEL_ID`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bot_token: non_empty(BOT_TOKEN_ENV),
            chat_id: non_empty(CHAT_ID_ENV),
            api_base: default_api_base(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}
