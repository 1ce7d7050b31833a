//! Runtime configuration, read from the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, WatchError};

/// Default school website polled for posts.
pub const DEFAULT_SCHOOL_URL: &str = "https://5icudine.edu.it";

/// Default poll interval in seconds (two hours).
pub const DEFAULT_INTERVAL_SECS: u64 = 7200;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_BOT_CHATID";
pub const ENV_STORE_PATH: &str = "CSV_FILE_PATH";
pub const ENV_INTERVAL: &str = "SCHEDULE_INTERVAL_SECONDS";
pub const ENV_SCHOOL_URL: &str = "SCHOOL_URL";
pub const ENV_DELIVERY_MODE: &str = "DELIVERY_MODE";
pub const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT_SECONDS";

/// When a post's link is written to the dedup store relative to its delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Record first, then send. A failed send is never retried.
    #[default]
    AtMostOnce,
    /// Send first, record only after the messaging API confirmed delivery.
    AtLeastOnce,
}

impl DeliveryMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AtMostOnce => "at-most-once",
            Self::AtLeastOnce => "at-least-once",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "at-most-once" => Ok(Self::AtMostOnce),
            "at-least-once" => Ok(Self::AtLeastOnce),
            other => Err(WatchError::Config(format!(
                "{ENV_DELIVERY_MODE} must be at-most-once or at-least-once, got {other:?}"
            ))),
        }
    }
}

/// Configuration for the watcher.
#[derive(Clone)]
pub struct WatchConfig {
    /// Telegram bot credential.
    pub bot_token: String,
    /// Telegram chat receiving every announcement.
    pub chat_id: String,
    /// Dedup store file; must already exist.
    pub store_path: PathBuf,
    /// Sleep between cycles.
    pub interval: Duration,
    /// School homepage.
    pub school_url: String,
    /// Dedup write ordering.
    pub delivery: DeliveryMode,
    /// Per-request timeout; `None` waits indefinitely.
    pub http_timeout: Option<Duration>,
}

impl WatchConfig {
    /// Create configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `TELEGRAM_BOT_TOKEN`: bot credential
    /// - `TELEGRAM_BOT_CHATID`: destination chat
    /// - `CSV_FILE_PATH`: dedup store path
    ///
    /// # Optional Environment Variables
    /// - `SCHEDULE_INTERVAL_SECONDS`: poll interval (default: 7200)
    /// - `SCHOOL_URL`: homepage to poll (default: https://5icudine.edu.it)
    /// - `DELIVERY_MODE`: at-most-once (default) or at-least-once
    /// - `HTTP_TIMEOUT_SECONDS`: per-request timeout (default: none)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key)
                .ok_or_else(|| WatchError::Config(format!("{key} environment variable not set")))
        };

        let bot_token = require(ENV_BOT_TOKEN)?;
        let chat_id = require(ENV_CHAT_ID)?;
        let store_path = PathBuf::from(require(ENV_STORE_PATH)?);

        let interval_secs = match get(ENV_INTERVAL) {
            Some(v) => parse_secs(ENV_INTERVAL, &v)?,
            None => DEFAULT_INTERVAL_SECS,
        };

        let http_timeout = get(ENV_HTTP_TIMEOUT)
            .map(|v| parse_secs(ENV_HTTP_TIMEOUT, &v))
            .transpose()?
            .map(Duration::from_secs);

        let delivery = get(ENV_DELIVERY_MODE)
            .map(|v| v.parse::<DeliveryMode>())
            .transpose()?
            .unwrap_or_default();

        let school_url = get(ENV_SCHOOL_URL)
            .unwrap_or_else(|| DEFAULT_SCHOOL_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bot_token,
            chat_id,
            store_path,
            interval: Duration::from_secs(interval_secs),
            school_url,
            delivery,
            http_timeout,
        })
    }

    /// Build the HTTP client shared by the fetcher and the messaging channel.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| WatchError::Config(format!("failed to build HTTP client: {e}")))
    }
}

impl fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("store_path", &self.store_path)
            .field("interval", &self.interval)
            .field("school_url", &self.school_url)
            .field("delivery", &self.delivery)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Parse a positive whole number of seconds.
fn parse_secs(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(WatchError::Config(format!(
            "{key} must be a positive whole number of seconds, got {value:?}"
        ))),
    }
}
