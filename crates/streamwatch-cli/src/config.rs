//! TOML configuration file schema and parsing.
//!
//! Every key is optional. Example config file:
//!
//! ```toml
//! [log]
//! format = "json"
//!
//! [check]
//! timeout_secs = 5
//!
//! [capture]
//! output = "/var/lib/streamwatch/screenshot.jpg"
//! position_ms = 2000
//! backend = "ffmpeg"
//! ffmpeg = "/usr/bin/ffmpeg"
//!
//! [telegram]
//! bot_token = "123456:ABC"
//! chat_id = "-1001234567890"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use streamwatch_core::{MonitorConfig, TelegramConfig};

/// Frame position used by the CLI when nothing else is configured.
pub const DEFAULT_POSITION_MS: u64 = 2000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub telegram: TelegramSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    pub output: Option<PathBuf>,
    pub position_ms: Option<u64>,
    pub backend: Option<String>,
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: Option<String>,
}

impl std::fmt::Debug for TelegramSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSection")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub position_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub backend: Option<String>,
    pub ffmpeg: Option<PathBuf>,
    pub log_format: Option<String>,
}

/// Everything the binary needs once flags, file and environment are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub telegram: TelegramConfig,
    pub backend: String,
    pub ffmpeg: PathBuf,
    pub log_format: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        validate_log_format(&self.log.format)?;

        if self.check.timeout_secs == Some(0) {
            return Err("check.timeout_secs must be greater than zero".into());
        }

        if let Some(ref backend) = self.capture.backend {
            validate_backend(backend)?;
        }

        if let Some(ref base) = self.telegram.api_base {
            let parsed = url::Url::parse(base)
                .map_err(|e| format!("Invalid telegram.api_base: {} ({})", base, e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(format!(
                    "telegram.api_base must use http or https: {}",
                    base
                ));
            }
        }

        Ok(())
    }

    /// Merge with command-line overrides and environment credentials.
    ///
    /// Precedence: flag, then config file, then environment, then default.
    pub fn resolve(&self, overrides: Overrides, env: TelegramConfig) -> Result<Settings, String> {
        let log_format = overrides
            .log_format
            .unwrap_or_else(|| self.log.format.clone());
        validate_log_format(&log_format)?;

        let backend = overrides
            .backend
            .or_else(|| self.capture.backend.clone())
            .unwrap_or_else(|| "ffmpeg".into());
        validate_backend(&backend)?;

        let timeout_secs = overrides.timeout_secs.or(self.check.timeout_secs).unwrap_or(5);
        if timeout_secs == 0 {
            return Err("Timeout must be greater than zero".into());
        }

        let mut monitor = MonitorConfig::default()
            .with_request_timeout(Duration::from_secs(timeout_secs))
            .with_frame_position_ms(
                overrides
                    .position_ms
                    .or(self.capture.position_ms)
                    .unwrap_or(DEFAULT_POSITION_MS),
            );
        if let Some(output) = overrides.output.or_else(|| self.capture.output.clone()) {
            monitor = monitor.with_output_path(output);
        }

        let mut telegram = TelegramConfig {
            bot_token: self.telegram.bot_token.clone().or(env.bot_token),
            chat_id: self.telegram.chat_id.clone().or(env.chat_id),
            api_base: env.api_base,
        };
        if let Some(ref base) = self.telegram.api_base {
            telegram = telegram.with_api_base(base.as_str());
        }

        let ffmpeg = overrides
            .ffmpeg
            .or_else(|| self.capture.ffmpeg.clone())
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));

        Ok(Settings {
            monitor,
            telegram,
            backend,
            ffmpeg,
            log_format,
        })
    }
}

/// Load `KEY=value` lines into the process environment.
///
/// With no explicit path, `.env` is looked up from the current directory
/// upwards and a missing file is not an error. Variables already set in the
/// environment are never overwritten. Returns the file that was loaded.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, String> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map(|()| Some(path.to_path_buf()))
            .map_err(|e| format!("Failed to load env file {}: {}", path.display(), e)),
        None => match dotenvy::dotenv() {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(format!("Failed to load .env file: {}", e)),
        },
    }
}

fn validate_log_format(format: &str) -> Result<(), String> {
    match format {
        "pretty" | "json" => Ok(()),
        other => Err(format!(
            "Invalid log format '{}': must be 'pretty' or 'json'",
            other
        )),
    }
}

fn validate_backend(backend: &str) -> Result<(), String> {
    match backend {
        "ffmpeg" => Ok(()),
        "libav" if cfg!(feature = "libav") => Ok(()),
        "libav" => Err("Capture backend 'libav' requires building with the 'libav' feature".into()),
        other => Err(format!(
            "Invalid capture backend '{}': must be 'ffmpeg' or 'libav'",
            other
        )),
    }
}
