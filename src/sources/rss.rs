//! Shared RSS 2.0 deserialization for the article feeds.

use crate::model::RawItem;
use crate::sources::{normalize_text, parse_rfc2822_utc};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "guid")]
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<String>,
}

// guid carries an isPermaLink attribute, so the text node needs a wrapper.
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

/// Parse an RSS 2.0 document into raw items, keeping entries published at or
/// after `cutoff`. The guid falls back to the link when absent (some feeds
/// only set one of the two).
pub fn parse_rss(xml: &str, cutoff: DateTime<Utc>) -> Result<Vec<RawItem>> {
    let rss: Rss = from_str(xml).context("parsing rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.items.len());
    for item in rss.channel.items {
        let link = item.link.as_deref().unwrap_or_default().trim().to_string();
        let guid = item
            .guid
            .and_then(|g| g.value)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| link.clone());
        if guid.is_empty() {
            continue;
        }

        let published_at = item
            .pub_date
            .as_deref()
            .map(parse_rfc2822_utc)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        if published_at < cutoff {
            continue;
        }

        out.push(RawItem {
            natural_key: guid,
            title: normalize_text(item.title.as_deref().unwrap_or_default()),
            url: link,
            published_at,
            primary_body: normalize_text(item.description.as_deref().unwrap_or_default()),
            category: item.categories.into_iter().next().map(|c| normalize_text(&c)),
        });
    }

    Ok(out)
}
