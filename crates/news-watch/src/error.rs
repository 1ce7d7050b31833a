//! Error types for the news watcher.

use std::path::PathBuf;

use notify::ChannelError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = WatchError> = std::result::Result<T, E>;

/// Errors raised while fetching, parsing, deduplicating or announcing posts.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The HTTP request did not complete.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP request completed with a non-success status.
    #[error("{url} answered with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The page no longer has the expected structure.
    #[error("post container #{index}: {reason}")]
    Parse { index: usize, reason: String },

    /// The dedup store could not be read or written.
    #[error("dedup store {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The messaging channel refused or failed the delivery.
    #[error("notification failed: {0}")]
    Notify(#[from] ChannelError),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WatchError {
    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn parse(index: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether a later cycle could succeed where this one failed.
    ///
    /// Configuration problems never fix themselves; everything else may be a
    /// transient outage or a markup change that gets reverted.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
