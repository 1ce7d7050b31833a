//! Telegram Bot API notification channel.
//!
//! Photos are delivered through the `sendPhoto` method as a multipart upload:
//! the caption and routing fields travel as text parts and the image bytes as
//! the `photo` file part. Only HTTP 200 counts as delivered.

use std::fmt;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::message::PhotoMessage;
use crate::NotifyChannel;

/// Public Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API channel.
#[derive(Clone)]
pub struct TelegramChannel {
    api_base: String,
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

/// Error envelope returned by the Bot API.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    parameters: Option<ApiErrorParameters>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorParameters {
    retry_after: Option<u64>,
}

impl TelegramChannel {
    /// Create a Telegram channel with a specific token and chat.
    #[must_use]
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API host (self-hosted server, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Full `sendPhoto` URL for the configured token.
    fn send_photo_url(&self) -> String {
        format!("{}/bot{}/sendPhoto", self.api_base, self.bot_token)
    }

    fn build_form(chat_id: &str, message: &PhotoMessage) -> Result<Form, ChannelError> {
        let photo = Part::bytes(message.photo.clone())
            .file_name(message.file_name.clone())
            .mime_str("application/octet-stream")?;

        Ok(Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", message.caption.clone())
            .text("parse_mode", "html")
            .part("photo", photo))
    }
}

impl fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn enabled(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    async fn send(&self, message: &PhotoMessage) -> Result<(), ChannelError> {
        if self.bot_token.is_empty() {
            return Err(ChannelError::NotConfigured("bot token is empty".to_string()));
        }
        if self.chat_id.is_empty() {
            return Err(ChannelError::NotConfigured("chat id is empty".to_string()));
        }

        let url = self.send_photo_url();
        let form = Self::build_form(&self.chat_id, message)?;

        debug!(
            caption = %message.caption,
            bytes = message.photo.len(),
            "Sending Telegram photo"
        );

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if status == StatusCode::OK {
            info!(caption = %message.caption, "Telegram photo delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = serde_json::from_str::<ApiError>(&body)
                .ok()
                .and_then(|e| e.parameters)
                .and_then(|p| p.retry_after)
                .unwrap_or(60);
            return Err(ChannelError::RateLimited {
                retry_after_secs,
                body,
            });
        }

        Err(ChannelError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
