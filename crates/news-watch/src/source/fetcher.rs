//! HTTP access to the school website and the images it links.

use reqwest::Client;

use crate::error::{Result, WatchError};

/// Fetches the homepage HTML and post images.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    school_url: String,
    client: Client,
}

impl SourceFetcher {
    /// Create a fetcher for the given homepage.
    #[must_use]
    pub fn new(school_url: impl Into<String>, client: Client) -> Self {
        Self {
            school_url: school_url.into(),
            client,
        }
    }

    /// Homepage URL this fetcher polls.
    #[must_use]
    pub fn school_url(&self) -> &str {
        &self.school_url
    }

    /// Fetch the homepage HTML.
    pub async fn fetch_page(&self) -> Result<String> {
        tracing::debug!(url = %self.school_url, "Fetching homepage");

        let response = self.get(&self.school_url).await?;
        let html = response
            .text()
            .await
            .map_err(|e| WatchError::network(&self.school_url, e))?;

        tracing::debug!(len = html.len(), "Got page content");
        Ok(html)
    }

    /// Download an image referenced by a post.
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WatchError::network(url, e))?;

        tracing::debug!(url, bytes = bytes.len(), "Downloaded post image");
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WatchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}
