//! Anthropic newsroom source: three mirrored RSS feeds (news, research,
//! engineering) deduped by guid, plus full-article text as secondary content.
//!
//! The feed guids are the canonical article URLs, so the natural key doubles
//! as the fetch target for the secondary pass.

use crate::model::{ContentKind, RawItem};
use crate::sources::rss::parse_rss;
use crate::sources::{html_to_text, ContentSource, SecondaryFetch};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use std::collections::HashSet;
use tracing::warn;

const DEFAULT_FEED_URLS: [&str; 3] = [
    "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_anthropic_news.xml",
    "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_anthropic_research.xml",
    "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feeds/feed_anthropic_engineering.xml",
];

pub struct AnthropicNewsSource {
    feed_urls: Vec<String>,
    client: reqwest::Client,
}

impl AnthropicNewsSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            feed_urls: DEFAULT_FEED_URLS.iter().map(|s| s.to_string()).collect(),
            client,
        }
    }

    pub fn with_feed_urls(mut self, urls: Vec<String>) -> Self {
        self.feed_urls = urls;
        self
    }

    /// Parse fetched feed bodies, deduping by guid across feeds. A body that
    /// fails to parse is logged and skipped, same as a failed fetch; one bad
    /// mirror never hides the others.
    pub fn parse_feeds<'a>(
        bodies: impl IntoIterator<Item = &'a str>,
        cutoff: DateTime<Utc>,
    ) -> Vec<RawItem> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();

        for body in bodies {
            match parse_rss(body, cutoff) {
                Ok(items) => {
                    for item in items {
                        if seen.insert(item.natural_key.clone()) {
                            out.push(item);
                        }
                    }
                }
                Err(e) => warn!(error = ?e, "anthropic feed parse failed"),
            }
        }

        out
    }
}

#[async_trait::async_trait]
impl ContentSource for AnthropicNewsSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Anthropic
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn fetch_recent(&self, window_hours: i64) -> Result<Vec<RawItem>> {
        let cutoff = Utc::now() - Duration::hours(window_hours);
        let mut bodies = Vec::with_capacity(self.feed_urls.len());

        for url in &self.feed_urls {
            // The three feeds overlap; one failing feed should not hide the
            // other two.
            match self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
            {
                Ok(resp) => {
                    bodies.push(resp.text().await.context("reading anthropic feed body")?)
                }
                Err(e) => warn!(error = ?e, feed = %url, "anthropic feed fetch failed"),
            }
        }

        let out = Self::parse_feeds(bodies.iter().map(String::as_str), cutoff);
        counter!("source_items_fetched_total", "source" => "anthropic")
            .increment(out.len() as u64);
        Ok(out)
    }

    async fn fetch_secondary(&self, natural_key: &str) -> Result<SecondaryFetch> {
        if !natural_key.starts_with("http") {
            return Ok(SecondaryFetch::Unavailable);
        }

        let html = self
            .client
            .get(natural_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("fetching anthropic article {natural_key}"))?
            .text()
            .await
            .context("reading anthropic article body")?;

        let text = html_to_text(&html);
        Ok(if text.is_empty() {
            SecondaryFetch::Unavailable
        } else {
            SecondaryFetch::Available(text)
        })
    }
}
