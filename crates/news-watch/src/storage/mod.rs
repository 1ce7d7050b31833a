//! Persistent state for the watcher.

mod dedup;

pub use dedup::DedupStore;
