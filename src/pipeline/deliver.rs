//! Ranking, assembly and delivery: one batched ranking call over the recent
//! digests, joined back onto digest fields, bounded to top-N, rendered twice
//! and handed to the notifier.
//!
//! An empty window short-circuits before any generation call. A total ranker
//! failure aborts the stage; no partial email is ever sent. Delivery carries
//! no idempotency key (a re-run after a partial failure sends again); keying
//! sends to a run id is left to the caller.

use crate::ai::{IntroGenerator, Ranker};
use crate::email::{fallback_intro, subject_for, EmailDigestPayload, RankedArticle};
use crate::notify::Notifier;
use crate::profile::UserProfile;
use crate::rank::{normalize_ranking, RankCandidate};
use crate::store::ContentStore;
use anyhow::{Context, Result};
use chrono::Utc;
use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Serialize)]
pub struct DeliveryStats {
    pub sent: bool,
    pub skipped_no_content: bool,
    pub subject: Option<String>,
    pub total_ranked: usize,
    pub shown: usize,
}

#[allow(clippy::too_many_arguments)]
pub async fn run_delivery(
    store: &ContentStore,
    ranker: Arc<dyn Ranker>,
    intro_gen: Arc<dyn IntroGenerator>,
    notifier: Arc<dyn Notifier>,
    profile: &UserProfile,
    recipients: &[String],
    window_hours: i64,
    top_n: usize,
    call_timeout: Duration,
) -> Result<DeliveryStats> {
    let digests = store.recent_digests(window_hours).await?;
    if digests.is_empty() {
        info!(window_hours, "no digests in window; skipping delivery");
        return Ok(DeliveryStats {
            skipped_no_content: true,
            ..DeliveryStats::default()
        });
    }

    // Single batched ranking call; its failure gates delivery.
    let candidates: Vec<RankCandidate> = digests.iter().map(RankCandidate::from_digest).collect();
    let raw = tokio::time::timeout(call_timeout, ranker.rank(profile, &candidates))
        .await
        .map_err(|_| anyhow::anyhow!("ranking timed out"))
        .and_then(|r| r)
        .context("ranking digests")?;
    let ranked = normalize_ranking(&candidates, raw)?;
    let total_ranked = ranked.len();

    let by_id: HashMap<&str, &crate::model::DigestRecord> =
        digests.iter().map(|d| (d.id.as_str(), d)).collect();

    let articles: Vec<RankedArticle> = ranked
        .iter()
        .take(top_n)
        .filter_map(|entry| {
            by_id.get(entry.digest_id.as_str()).map(|d| RankedArticle {
                digest_id: entry.digest_id.clone(),
                rank: entry.rank,
                score: entry.score,
                title: d.title.clone(),
                summary: d.summary.clone(),
                url: d.url.clone(),
                kind: d.kind,
                reasoning: (!entry.reasoning.is_empty()).then(|| entry.reasoning.clone()),
            })
        })
        .collect();

    let intro = match tokio::time::timeout(
        call_timeout,
        intro_gen.generate_intro(profile, &articles),
    )
    .await
    {
        Ok(Ok(intro)) => intro,
        Ok(Err(e)) => {
            warn!(error = ?e, "intro generation failed; using fallback");
            fallback_intro(profile)
        }
        Err(_) => {
            warn!("intro generation timed out; using fallback");
            fallback_intro(profile)
        }
    };

    let payload = EmailDigestPayload::new(intro, articles, total_ranked);
    let subject = subject_for(Utc::now());

    notifier
        .send(&subject, &payload.to_markdown(), &payload.to_html(), recipients)
        .await
        .context("delivering digest email")?;

    counter!("digest_emails_sent_total").increment(1);
    info!(subject = %subject, shown = payload.shown, total_ranked, "digest email sent");

    Ok(DeliveryStats {
        sent: true,
        skipped_no_content: false,
        subject: Some(subject),
        total_ranked,
        shown: payload.shown,
    })
}
