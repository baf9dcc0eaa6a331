//! Capability contracts consumed by the pipeline: summarization, relevance
//! ranking, and intro generation. Instances are injected at orchestrator
//! construction; lifecycle belongs to the caller.

pub mod openai;

pub use openai::OpenAiClient;

use crate::email::{EmailIntro, RankedArticle};
use crate::model::ContentKind;
use crate::profile::UserProfile;
use crate::rank::{RankCandidate, RankedEntry};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Title + summary produced for one content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub title: String,
    pub summary: String,
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, body: &str, kind: ContentKind)
        -> Result<SummaryOutput>;
}

#[async_trait::async_trait]
pub trait Ranker: Send + Sync {
    /// Rank a whole batch of digests in one call. Never invoked per item.
    async fn rank(
        &self,
        profile: &UserProfile,
        candidates: &[RankCandidate],
    ) -> Result<Vec<RankedEntry>>;
}

#[async_trait::async_trait]
pub trait IntroGenerator: Send + Sync {
    /// Short personalized greeting + introduction for the top articles.
    /// Callers supply a deterministic fallback on error.
    async fn generate_intro(
        &self,
        profile: &UserProfile,
        top_articles: &[RankedArticle],
    ) -> Result<EmailIntro>;
}
