//! Notification channel implementations.

pub mod telegram;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::PhotoMessage;

/// Trait for notification channels (Telegram, etc.).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver a captioned photo to this channel.
    async fn send(&self, message: &PhotoMessage) -> Result<(), ChannelError>;
}
