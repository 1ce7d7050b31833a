//! Homepage HTML parser.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::types::Post;
use crate::error::{Result, WatchError};

static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.layout-articolo2").expect("Invalid container selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("Invalid anchor selector"));
static DAY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.dataGiorno").expect("Invalid day selector"));
static MONTH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.dataMese").expect("Invalid month selector"));
static YEAR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.dataAnno").expect("Invalid year selector"));
static IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.immagine_post").expect("Invalid image selector"));

/// `background-image: url(...)` target inside an inline style.
static IMAGE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<url>https?://[^\s]+)\);").expect("Invalid image URL regex"));

/// Parser for the school homepage's featured news block.
pub struct PostParser;

impl PostParser {
    /// Parse posts from homepage HTML.
    ///
    /// Posts are returned oldest first: the homepage lists the newest post at
    /// the top, and announcements should go out in publication order.
    pub fn parse(html: &str) -> Result<Vec<Post>> {
        let document = Html::parse_document(html);
        let containers: Vec<_> = document.select(&CONTAINER).collect();
        tracing::debug!(container_count = containers.len(), "Found post containers");

        if containers.is_empty() {
            tracing::warn!(
                "No post containers found in HTML (selector: div.layout-articolo2). \
                 The homepage may be empty or its markup may have changed."
            );
            return Ok(Vec::new());
        }

        let mut posts = containers
            .into_iter()
            .enumerate()
            .map(|(index, container)| Self::parse_container(index, container))
            .collect::<Result<Vec<_>>>()?;
        posts.reverse();

        tracing::info!(count = posts.len(), "Parsed posts from HTML");
        Ok(posts)
    }

    fn parse_container(index: usize, container: ElementRef<'_>) -> Result<Post> {
        let anchor = container
            .select(&ANCHOR)
            .next()
            .ok_or_else(|| WatchError::parse(index, "missing anchor"))?;
        let title = Self::attr(index, anchor, "title")?;
        let link = Self::attr(index, anchor, "href")?;

        let day = Self::text(index, container, &DAY, "span.dataGiorno")?;
        let month = Self::text(index, container, &MONTH, "span.dataMese")?;
        let year = Self::text(index, container, &YEAR, "span.dataAnno")?;

        let image = container
            .select(&IMAGE)
            .next()
            .ok_or_else(|| WatchError::parse(index, "missing div.immagine_post"))?;
        let style = Self::attr(index, image, "style")?;
        let image_url = Self::extract_image_url(&style).ok_or_else(|| {
            WatchError::parse(index, format!("no image URL in style {style:?}"))
        })?;

        tracing::debug!(index, link = %link, "Parsed post");
        Ok(Post {
            title,
            link,
            day,
            month,
            year,
            image_url,
        })
    }

    /// Pull the image URL out of a CSS `background-image: url(...);` declaration.
    pub fn extract_image_url(style: &str) -> Option<String> {
        IMAGE_URL
            .captures(style)
            .and_then(|caps| caps.name("url"))
            .map(|m| m.as_str().trim_end_matches(['\'', '"']).to_string())
    }

    fn attr(index: usize, element: ElementRef<'_>, name: &str) -> Result<String> {
        element
            .value()
            .attr(name)
            .map(str::to_string)
            .ok_or_else(|| {
                WatchError::parse(
                    index,
                    format!("<{}> missing {name} attribute", element.value().name()),
                )
            })
    }

    fn text(
        index: usize,
        container: ElementRef<'_>,
        selector: &Selector,
        label: &str,
    ) -> Result<String> {
        container
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .ok_or_else(|| WatchError::parse(index, format!("missing {label}")))
    }
}
