//! YouTube source: per-channel Atom feeds for discovery, the timedtext
//! endpoint for caption transcripts.

use crate::model::{ContentKind, RawItem};
use crate::sources::{normalize_text, ContentSource, SecondaryFetch};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

const FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";
const TIMEDTEXT_URL: &str = "https://video.google.com/timedtext";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    // quick-xml's serde deserializer strips namespace prefixes from element
    // names, so `yt:videoId` arrives as `videoId` (same for media:* below).
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    title: Option<String>,
    link: Option<Link>,
    published: Option<String>,
    #[serde(rename = "group")]
    media: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaGroup {
    #[serde(rename = "description")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(rename = "text", default)]
    texts: Vec<Caption>,
}

#[derive(Debug, Deserialize)]
struct Caption {
    #[serde(rename = "$text")]
    value: Option<String>,
}

pub struct YoutubeSource {
    channels: Vec<String>,
    client: reqwest::Client,
}

impl YoutubeSource {
    pub fn new(channels: Vec<String>, client: reqwest::Client) -> Self {
        Self { channels, client }
    }

    /// Parse one channel feed, keeping entries published at or after `cutoff`.
    pub fn parse_feed(xml: &str, cutoff: DateTime<Utc>) -> Result<Vec<RawItem>> {
        let feed: Feed = from_str(xml).context("parsing youtube atom feed")?;

        let mut out = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            let Some(video_id) = entry.video_id.filter(|id| !id.is_empty()) else {
                continue;
            };
            let Some(published_at) = entry
                .published
                .as_deref()
                .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                .map(|dt| dt.with_timezone(&Utc))
            else {
                continue;
            };
            if published_at < cutoff {
                continue;
            }

            let url = entry
                .link
                .and_then(|l| l.href)
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={video_id}"));

            out.push(RawItem {
                natural_key: video_id,
                title: normalize_text(entry.title.as_deref().unwrap_or_default()),
                url,
                published_at,
                primary_body: normalize_text(
                    entry
                        .media
                        .and_then(|m| m.description)
                        .as_deref()
                        .unwrap_or_default(),
                ),
                category: None,
            });
        }

        Ok(out)
    }

    /// Parse a timedtext caption document into one transcript string.
    /// Returns `None` when the document carries no captions (YouTube answers
    /// an empty body for videos without a track).
    pub fn parse_timedtext(xml: &str) -> Option<String> {
        if xml.trim().is_empty() {
            return None;
        }
        let doc: TimedText = from_str(xml).ok()?;
        let joined = doc
            .texts
            .into_iter()
            .filter_map(|c| c.value)
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

#[async_trait::async_trait]
impl ContentSource for YoutubeSource {
    fn kind(&self) -> ContentKind {
        ContentKind::Youtube
    }

    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn fetch_recent(&self, window_hours: i64) -> Result<Vec<RawItem>> {
        let cutoff = Utc::now() - Duration::hours(window_hours);
        let mut out = Vec::new();

        for channel_id in &self.channels {
            let body = self
                .client
                .get(FEED_URL)
                .query(&[("channel_id", channel_id.as_str())])
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("fetching youtube feed for channel {channel_id}"))?
                .text()
                .await
                .context("reading youtube feed body")?;

            let mut items = Self::parse_feed(&body, cutoff)?;
            counter!("source_items_fetched_total", "source" => "youtube")
                .increment(items.len() as u64);
            out.append(&mut items);
        }

        Ok(out)
    }

    async fn fetch_secondary(&self, natural_key: &str) -> Result<SecondaryFetch> {
        let body = self
            .client
            .get(TIMEDTEXT_URL)
            .query(&[("lang", "en"), ("v", natural_key)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("fetching transcript for video {natural_key}"))?
            .text()
            .await
            .context("reading transcript body")?;

        Ok(match Self::parse_timedtext(&body) {
            Some(transcript) => SecondaryFetch::Available(transcript),
            None => SecondaryFetch::Unavailable,
        })
    }
}
