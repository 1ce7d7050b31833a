//! School website access: page fetching and post extraction.

mod fetcher;
mod parser;
mod types;

pub use fetcher::SourceFetcher;
pub use parser::PostParser;
pub use types::Post;
