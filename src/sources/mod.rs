//! Source adapters: per-kind intake of raw items and secondary content.

pub mod anthropic_news;
pub mod openai_news;
pub mod rss;
pub mod youtube;

use crate::model::{ContentKind, RawItem};
use anyhow::Result;
use chrono::{DateTime, Utc};
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

/// Outcome of a secondary fetch: either a body, or an explicit "this source
/// has no secondary content for this key".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryFetch {
    Available(String),
    Unavailable,
}

/// A content source the pipeline can pull from.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    fn kind(&self) -> ContentKind;
    fn name(&self) -> &'static str;

    /// Items published within the last `window_hours`.
    async fn fetch_recent(&self, window_hours: i64) -> Result<Vec<RawItem>>;

    /// Secondary body (transcript, full article text) for one item.
    async fn fetch_secondary(&self, natural_key: &str) -> Result<SecondaryFetch>;
}

/// Normalize feed text: entity-decode, strip tags, straighten quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Reduce an HTML page to readable text: drop script/style subtrees, then
/// run the normal feed-text normalization.
pub fn html_to_text(html: &str) -> String {
    static RE_BLOCKS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        // The regex crate has no backreferences, so spell out `</\1>` per tag.
        regex::Regex::new(
            r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<noscript[^>]*>.*?</noscript>|<head[^>]*>.*?</head>",
        )
        .unwrap()
    });
    normalize_text(&re_blocks.replace_all(html, " "))
}

/// Parse an RFC 2822 `pubDate` into a UTC timestamp. Unparseable dates map
/// to the epoch so the recency filter drops them.
pub fn parse_rfc2822_utc(ts: &str) -> DateTime<Utc> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
