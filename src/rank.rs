//! Ranking types and invariant enforcement.
//!
//! The Ranker capability is a single batched call; whatever comes back is
//! normalized here so downstream code can rely on: ranks exactly 1..=N,
//! unique, and score non-increasing with rank. Entries the ranker invented
//! (ids outside the candidate batch) or duplicated are dropped, not patched
//! with a default score.

use crate::model::{ContentKind, DigestRecord};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Projection of a digest handed to the ranker.
#[derive(Debug, Clone, Serialize)]
pub struct RankCandidate {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub kind: ContentKind,
}

impl RankCandidate {
    pub fn from_digest(d: &DigestRecord) -> Self {
        Self {
            id: d.id.clone(),
            title: d.title.clone(),
            summary: d.summary.clone(),
            kind: d.kind,
        }
    }
}

/// One ranked digest as produced by the ranker. Ephemeral; recomputed every
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntry {
    pub digest_id: String,
    pub score: f32,
    pub rank: u32,
    pub reasoning: String,
}

/// Enforce the ranking invariants on a raw ranker result.
///
/// Unknown and duplicate ids are excluded (they stay unranked); scores are
/// clamped to [0, 10]; the survivors are ordered by score descending and
/// re-ranked 1..=N. An empty survivor set for a nonempty batch is a failure:
/// no partial email is ever sent from an incomplete ranking.
pub fn normalize_ranking(
    candidates: &[RankCandidate],
    raw: Vec<RankedEntry>,
) -> Result<Vec<RankedEntry>> {
    let known: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<RankedEntry> = raw
        .into_iter()
        .filter(|e| known.contains(e.digest_id.as_str()) && seen.insert(e.digest_id.clone()))
        .map(|mut e| {
            e.score = e.score.clamp(0.0, 10.0);
            e
        })
        .collect();

    if kept.is_empty() && !candidates.is_empty() {
        bail!("ranker returned no usable entries for {} digests", candidates.len());
    }

    kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, entry) in kept.iter_mut().enumerate() {
        entry.rank = (i + 1) as u32;
    }

    Ok(kept)
}
