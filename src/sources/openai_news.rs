//! OpenAI newsroom source: one RSS feed, no secondary content (the feed
//! description is the whole body we digest).

use crate::model::{ContentKind, RawItem};
use crate::sources::rss::parse_rss;
use crate::sources::{ContentSource, SecondaryFetch};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use metrics::counter;

const DEFAULT_FEED_URL: &str = "https://openai.com/news/rss.xml";

pub struct OpenAiNewsSource {
    feed_url: String,
    client: reqwest::Client,
}

impl OpenAiNewsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            client,
        }
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }
}

#[async_trait::async_trait]
impl ContentSource for OpenAiNewsSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Openai
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    async fn fetch_recent(&self, window_hours: i64) -> Result<Vec<RawItem>> {
        let cutoff = Utc::now() - Duration::hours(window_hours);
        let body = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("fetching openai news feed")?
            .text()
            .await
            .context("reading openai news feed body")?;

        let items = parse_rss(&body, cutoff)?;
        counter!("source_items_fetched_total", "source" => "openai").increment(items.len() as u64);
        Ok(items)
    }

    async fn fetch_secondary(&self, _natural_key: &str) -> Result<SecondaryFetch> {
        // This kind has no secondary requirement; nothing to fetch.
        Ok(SecondaryFetch::Unavailable)
    }
}
