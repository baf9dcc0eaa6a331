//! Core data model: content kinds, items and digest records.
//!
//! `ContentItem` rows are append-only and owned by the store; the enrichment
//! stage is the only writer of the secondary fields. `DigestRecord` rows are
//! immutable once created and keyed by a deterministic `kind:natural_key` id.

use anyhow::{anyhow, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of content sources the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Youtube,
    Openai,
    Anthropic,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::Youtube,
        ContentKind::Openai,
        ContentKind::Anthropic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Youtube => "youtube",
            ContentKind::Openai => "openai",
            ContentKind::Anthropic => "anthropic",
        }
    }

    /// Per-kind store table (one append-only table per kind).
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Youtube => "youtube_videos",
            ContentKind::Openai => "openai_articles",
            ContentKind::Anthropic => "anthropic_articles",
        }
    }

    /// Whether items of this kind need a secondary body (transcript, full
    /// article text) fetched in a later pass before they can be digested.
    pub fn requires_secondary(&self) -> bool {
        matches!(self, ContentKind::Youtube | ContentKind::Anthropic)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(ContentKind::Youtube),
            "openai" => Ok(ContentKind::Openai),
            "anthropic" => Ok(ContentKind::Anthropic),
            other => Err(anyhow!("unknown content kind: {other}")),
        }
    }
}

/// Lifecycle of an item's secondary body.
///
/// `Unavailable` is terminal: once set, the enrichment stage never revisits
/// the item. Kinds without a secondary requirement are stored `Available`
/// from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryStatus {
    Missing,
    Available,
    Unavailable,
}

impl SecondaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecondaryStatus::Missing => "missing",
            SecondaryStatus::Available => "available",
            SecondaryStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for SecondaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecondaryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "missing" => Ok(SecondaryStatus::Missing),
            "available" => Ok(SecondaryStatus::Available),
            "unavailable" => Ok(SecondaryStatus::Unavailable),
            other => Err(anyhow!("unknown secondary status: {other}")),
        }
    }
}

/// Deterministic digest id for a content item.
pub fn digest_id(kind: ContentKind, natural_key: &str) -> String {
    format!("{}:{}", kind.as_str(), natural_key)
}

/// Raw item as produced by a source adapter, before the store has seen it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub natural_key: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub primary_body: String,
    pub category: Option<String>,
}

/// A persisted unit of ingested content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub natural_key: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub primary_body: String,
    pub category: Option<String>,
    pub secondary_body: Option<String>,
    pub secondary_status: SecondaryStatus,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Deterministic digest id for this item.
    pub fn digest_id(&self) -> String {
        digest_id(self.kind, &self.natural_key)
    }

    /// Body to feed the summarizer: the secondary body when one was fetched,
    /// the primary body otherwise.
    pub fn digest_body(&self) -> &str {
        self.secondary_body.as_deref().unwrap_or(&self.primary_body)
    }
}

/// A persisted title+summary derived once from one content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRecord {
    pub id: String,
    pub kind: ContentKind,
    pub natural_key: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
