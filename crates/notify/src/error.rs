//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// The messaging API answered with a non-success status
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s: {body}")]
    RateLimited { retry_after_secs: u64, body: String },
}
