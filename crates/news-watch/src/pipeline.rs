//! News pipeline - orchestrates the fetch-parse-dedup-notify cycle.

use std::sync::Arc;

use async_trait::async_trait;
use notify::{ChannelError, NotifyChannel, PhotoMessage, TelegramChannel};

use crate::config::{DeliveryMode, WatchConfig};
use crate::error::{Result, WatchError};
use crate::source::{Post, PostParser, SourceFetcher};
use crate::storage::DedupStore;

/// Result of a single poll cycle.
#[derive(Debug, Default)]
pub struct CycleResult {
    /// Number of posts found on the homepage.
    pub fetched: usize,
    /// Number skipped because they were announced before.
    pub already_seen: usize,
    /// Number announced successfully.
    pub sent: usize,
    /// Number whose image download or send failed.
    pub failed: usize,
    /// Links announced in this cycle, in send order.
    pub sent_links: Vec<String>,
    /// Errors encountered.
    pub errors: Vec<String>,
}

/// A unit of work the scheduler can run repeatedly.
#[async_trait]
pub trait PollCycle: Send + Sync {
    /// Run one complete cycle.
    async fn run_cycle(&self) -> Result<CycleResult>;
}

/// News pipeline orchestrator.
pub struct Pipeline {
    fetcher: SourceFetcher,
    store: DedupStore,
    channel: Arc<dyn NotifyChannel>,
    delivery: DeliveryMode,
}

impl Pipeline {
    /// Create a new pipeline.
    #[must_use]
    pub fn new(
        fetcher: SourceFetcher,
        store: DedupStore,
        channel: Arc<dyn NotifyChannel>,
        delivery: DeliveryMode,
    ) -> Self {
        tracing::debug!(
            channel = channel.name(),
            enabled = channel.enabled(),
            delivery = %delivery,
            "Pipeline ready"
        );
        Self {
            fetcher,
            store,
            channel,
            delivery,
        }
    }

    /// Wire up the production pipeline: school homepage, CSV store, Telegram.
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        let client = config.http_client()?;
        let store = DedupStore::open(&config.store_path)?;
        let fetcher = SourceFetcher::new(config.school_url.clone(), client.clone());
        let channel = TelegramChannel::new(config.bot_token.clone(), config.chat_id.clone())
            .with_client(client);

        Ok(Self::new(fetcher, store, Arc::new(channel), config.delivery))
    }

    /// Dedup store backing this pipeline.
    #[must_use]
    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    /// Run a single poll cycle.
    ///
    /// The homepage is fetched and parsed fresh every time. Page-level
    /// failures (fetch, parse, store I/O) abort the cycle; a failed image
    /// download or send only affects its own post.
    pub async fn poll_cycle(&self) -> Result<CycleResult> {
        let mut result = CycleResult::default();

        tracing::info!(url = %self.fetcher.school_url(), "Starting poll cycle");

        let html = self.fetcher.fetch_page().await?;
        let posts = PostParser::parse(&html)?;
        result.fetched = posts.len();

        for post in posts {
            let already_seen = match self.delivery {
                DeliveryMode::AtMostOnce => self.store.check_and_record(&post.link)?,
                DeliveryMode::AtLeastOnce => self.store.contains(&post.link)?,
            };

            if already_seen {
                tracing::debug!(link = %post.link, "Already announced");
                result.already_seen += 1;
                continue;
            }

            tracing::info!(
                title = %post.title,
                link = %post.link,
                date = %post.date_label(),
                "Announcing new post"
            );

            match self.announce(&post).await {
                Ok(()) => {
                    if self.delivery == DeliveryMode::AtLeastOnce {
                        self.store.record(&post.link)?;
                    }
                    tracing::info!(title = %post.title, "Message sent successfully");
                    result.sent += 1;
                    result.sent_links.push(post.link);
                }
                Err(e) => {
                    log_delivery_failure(&post, &e);
                    result.failed += 1;
                    result.errors.push(format!("{}: {e}", post.link));
                }
            }
        }

        tracing::info!(
            fetched = result.fetched,
            already_seen = result.already_seen,
            sent = result.sent,
            failed = result.failed,
            "Poll cycle complete"
        );

        Ok(result)
    }

    /// Download the post image and send the captioned photo.
    async fn announce(&self, post: &Post) -> Result<()> {
        let photo = self.fetcher.fetch_image(&post.image_url).await?;
        let message = PhotoMessage::new(post.caption(), photo);
        self.channel.send(&message).await?;
        Ok(())
    }
}

#[async_trait]
impl PollCycle for Pipeline {
    async fn run_cycle(&self) -> Result<CycleResult> {
        self.poll_cycle().await
    }
}

fn log_delivery_failure(post: &Post, error: &WatchError) {
    match error {
        WatchError::Notify(ChannelError::Rejected { status, body }) => {
            tracing::error!(
                title = %post.title,
                status,
                body = %body,
                "Failed to send message"
            );
        }
        WatchError::Notify(ChannelError::RateLimited {
            retry_after_secs,
            body,
        }) => {
            tracing::error!(
                title = %post.title,
                status = 429_u16,
                retry_after_secs,
                body = %body,
                "Failed to send message"
            );
        }
        other => {
            tracing::error!(
                title = %post.title,
                link = %post.link,
                error = %other,
                "Failed to announce post"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Channel that records captions and can be told to reject or rate limit
    /// some of them.
    #[derive(Default)]
    struct RecordingChannel {
        captions: Mutex<Vec<String>>,
        reject_containing: Option<String>,
        rate_limit_containing: Option<String>,
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn send(&self, message: &PhotoMessage) -> std::result::Result<(), ChannelError> {
            self.captions.lock().unwrap().push(message.caption.clone());
            let caption = message.caption.as_str();
            let matches = |needle: Option<&str>| needle.is_some_and(|n| caption.contains(n));
            if matches(self.reject_containing.as_deref()) {
                return Err(ChannelError::Rejected {
                    status: 400,
                    body: "Bad Request".to_string(),
                });
            }
            if matches(self.rate_limit_containing.as_deref()) {
                return Err(ChannelError::RateLimited {
                    retry_after_secs: 5,
                    body: "Too Many Requests: retry after 5".to_string(),
                });
            }
            Ok(())
        }
    }

    fn post_html(server: &MockServer, id: u32, title: &str, day: &str) -> String {
        format!(
            r#"<div class="layout-articolo2">
                 <div class="immagine_post" style="background-image: url({}/img/{id}.jpg);"></div>
                 <a href="/news/{id}" title="{title}">{title}</a>
                 <span class="dataGiorno">{day}</span><span class="dataMese">10</span><span class="dataAnno">2024</span>
               </div>"#,
            server.uri()
        )
    }

    async fn serve(server: &MockServer, body: String) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/42.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/43.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![4, 5, 6]))
            .mount(server)
            .await;
    }

    fn pipeline(
        server: &MockServer,
        store: &NamedTempFile,
        channel: Arc<RecordingChannel>,
        delivery: DeliveryMode,
    ) -> Pipeline {
        Pipeline::new(
            SourceFetcher::new(server.uri(), reqwest::Client::new()),
            DedupStore::open(store.path()).unwrap(),
            channel,
            delivery,
        )
    }

    #[tokio::test]
    async fn test_announces_new_posts_oldest_first() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body>{}{}</body></html>",
            post_html(&server, 43, "Uscita anticipata", "10"),
            post_html(&server, 42, "Sciopero", "09"),
        );
        serve(&server, html).await;

        let store = NamedTempFile::new().unwrap();
        let channel = Arc::new(RecordingChannel::default());
        let p = pipeline(&server, &store, channel.clone(), DeliveryMode::AtMostOnce);

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.fetched, 2);
        assert_eq!(result.sent, 2);
        assert_eq!(result.sent_links, vec!["/news/42", "/news/43"]);
        assert_eq!(
            *channel.captions.lock().unwrap(),
            vec!["Sciopero: /news/42", "Uscita anticipata: /news/43"]
        );

        // Second cycle sees the same page and stays quiet.
        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.already_seen, 2);
        assert_eq!(result.sent, 0);
        assert_eq!(channel.captions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_skips_recorded_link() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body>{}{}</body></html>",
            post_html(&server, 43, "Uscita anticipata", "10"),
            post_html(&server, 42, "Sciopero", "09"),
        );
        serve(&server, html).await;

        let mut store = NamedTempFile::new().unwrap();
        store.write_all(b"/news/42\r\n").unwrap();
        let channel = Arc::new(RecordingChannel::default());
        let p = pipeline(&server, &store, channel.clone(), DeliveryMode::AtMostOnce);

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.already_seen, 1);
        assert_eq!(result.sent_links, vec!["/news/43"]);
        assert_eq!(p.store().len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rejected_send_stays_recorded_at_most_once() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body>{}{}</body></html>",
            post_html(&server, 43, "Uscita anticipata", "10"),
            post_html(&server, 42, "Sciopero", "09"),
        );
        serve(&server, html).await;

        let store = NamedTempFile::new().unwrap();
        let channel = Arc::new(RecordingChannel {
            reject_containing: Some("/news/42".to_string()),
            ..Default::default()
        });
        let p = pipeline(&server, &store, channel.clone(), DeliveryMode::AtMostOnce);

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.sent_links, vec!["/news/43"]);
        assert!(p.store().contains("/news/42").unwrap());

        // Never retried.
        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.already_seen, 2);
        assert_eq!(channel.captions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_send_is_retried_at_least_once() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body>{}</body></html>",
            post_html(&server, 42, "Sciopero", "09"),
        );
        serve(&server, html).await;

        let store = NamedTempFile::new().unwrap();
        let channel = Arc::new(RecordingChannel {
            reject_containing: Some("/news/42".to_string()),
            ..Default::default()
        });
        let p = pipeline(&server, &store, channel.clone(), DeliveryMode::AtLeastOnce);

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.failed, 1);
        assert!(!p.store().contains("/news/42").unwrap());

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(channel.captions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_send_fails_only_that_post() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body>{}{}</body></html>",
            post_html(&server, 43, "Uscita anticipata", "10"),
            post_html(&server, 42, "Sciopero", "09"),
        );
        serve(&server, html).await;

        let store = NamedTempFile::new().unwrap();
        let channel = Arc::new(RecordingChannel {
            rate_limit_containing: Some("/news/42".to_string()),
            ..Default::default()
        });
        let p = pipeline(&server, &store, channel.clone(), DeliveryMode::AtMostOnce);

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.sent_links, vec!["/news/43"]);
        assert!(result.errors[0].starts_with("/news/42"));
        assert!(result.errors[0].contains("Too Many Requests"), "{}", result.errors[0]);
        assert!(p.store().contains("/news/42").unwrap());
    }

    #[tokio::test]
    async fn test_missing_image_fails_only_that_post() {
        let server = MockServer::start().await;
        let html = format!(
            "<html><body>{}{}</body></html>",
            post_html(&server, 44, "Senza immagine", "11"),
            post_html(&server, 42, "Sciopero", "09"),
        );
        serve(&server, html).await;

        let store = NamedTempFile::new().unwrap();
        let channel = Arc::new(RecordingChannel::default());
        let p = pipeline(&server, &store, channel.clone(), DeliveryMode::AtMostOnce);

        let result = p.poll_cycle().await.unwrap();
        assert_eq!(result.sent_links, vec!["/news/42"]);
        assert_eq!(result.failed, 1);
        assert!(result.errors[0].starts_with("/news/44"));
    }

    #[tokio::test]
    async fn test_page_failure_aborts_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = NamedTempFile::new().unwrap();
        let channel = Arc::new(RecordingChannel::default());
        let p = pipeline(&server, &store, channel, DeliveryMode::AtMostOnce);

        let err = p.run_cycle().await.unwrap_err();
        assert!(matches!(err, WatchError::HttpStatus { status: 500, .. }));
        assert!(p.store().is_empty().unwrap());
    }
}
