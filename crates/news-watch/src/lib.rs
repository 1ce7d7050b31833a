//! School news watcher.
//!
//! This crate provides:
//! - Homepage fetching and post extraction for the 5IC Udine website
//! - A CSV-backed record of already announced posts
//! - Telegram photo announcements for new posts
//! - A supervised poll loop with restart backoff

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod storage;

// Re-export main types
pub use config::{DeliveryMode, WatchConfig};
pub use error::{Result, WatchError};
pub use pipeline::{CycleResult, Pipeline, PollCycle};
pub use scheduler::{ScheduleConfig, Scheduler};
pub use source::{Post, PostParser, SourceFetcher};
pub use storage::DedupStore;
