//! Outbound messaging for school news announcements.
//!
//! This crate delivers captioned photos to messaging platforms. Delivery is
//! awaited and the outcome returned to the caller, so a pipeline can decide
//! what a failed send means for its own bookkeeping.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{NotifyChannel, PhotoMessage, TelegramChannel};
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let channel = TelegramChannel::new("123456:bot-token", "-1001234567890");
//! let message = PhotoMessage::new("Sciopero: /news/42", b"...image bytes...".to_vec());
//! channel.send(&message).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`TelegramChannel`] implements the Bot API `sendPhoto` method

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod message;

pub use channels::telegram::TelegramChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use message::PhotoMessage;
