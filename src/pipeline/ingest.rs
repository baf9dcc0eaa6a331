//! Ingest stage: pull recent items from every source and upsert them.
//!
//! Sources are fetched concurrently; a failing source logs a warning and
//! contributes zero counts instead of aborting the stage (the source set is
//! unbounded and partially failing by nature). Store writes are idempotent,
//! so re-running the stage is always safe.

use crate::model::ContentKind;
use crate::sources::ContentSource;
use crate::store::ContentStore;
use anyhow::{Context, Result};
use metrics::counter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct IngestStats {
    pub fetched: usize,
    pub created: usize,
}

pub async fn run_ingest(
    store: &ContentStore,
    sources: &[Arc<dyn ContentSource>],
    window_hours: i64,
    call_timeout: Duration,
) -> Result<BTreeMap<ContentKind, IngestStats>> {
    let mut set = JoinSet::new();
    for source in sources {
        let source = source.clone();
        set.spawn(async move {
            let kind = source.kind();
            let name = source.name();
            let fetched = tokio::time::timeout(call_timeout, source.fetch_recent(window_hours))
                .await
                .map_err(|_| anyhow::anyhow!("fetch timed out"))
                .and_then(|r| r);
            (kind, name, fetched)
        });
    }

    let mut stats: BTreeMap<ContentKind, IngestStats> = BTreeMap::new();
    while let Some(joined) = set.join_next().await {
        let (kind, name, fetched) = joined.context("ingest task panicked")?;
        let entry = stats.entry(kind).or_default();
        match fetched {
            Ok(items) => {
                let created = store
                    .bulk_upsert(kind, &items)
                    .await
                    .with_context(|| format!("upserting {name} items"))?;
                entry.fetched += items.len();
                entry.created += created;
                counter!("ingest_created_total").increment(created as u64);
                info!(source = name, fetched = items.len(), created, "source ingested");
            }
            Err(e) => {
                warn!(source = name, error = ?e, "source fetch failed");
                counter!("ingest_source_errors_total").increment(1);
            }
        }
    }

    Ok(stats)
}
