//! Enrichment stage: backfill secondary bodies for items still missing one.
//!
//! A fetch that reports "no content" or fails in any way marks the item with
//! the terminal `unavailable` sentinel, so a permanently failing fetch is
//! never reattempted. One item's failure never aborts the batch.

use crate::model::SecondaryStatus;
use crate::sources::{ContentSource, SecondaryFetch};
use crate::store::ContentStore;
use anyhow::Result;
use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct EnrichStats {
    pub total: usize,
    pub processed: usize,
    pub unavailable: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Processed,
    Unavailable,
    Failed,
}

pub async fn run_enrich(
    store: &ContentStore,
    source: Arc<dyn ContentSource>,
    concurrency: usize,
    call_timeout: Duration,
    limit: Option<i64>,
    shutdown: &AtomicBool,
) -> Result<EnrichStats> {
    let kind = source.kind();
    let items = store.items_missing_secondary(kind, limit).await?;

    let mut stats = EnrichStats {
        total: items.len(),
        ..EnrichStats::default()
    };

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for item in items {
        // Cooperative shutdown: in-flight items finish, no new ones start.
        if shutdown.load(Ordering::Relaxed) {
            stats.total -= 1;
            continue;
        }

        let permit = semaphore.clone().acquire_owned().await?;
        let source = source.clone();
        let store = store.clone();
        set.spawn(async move {
            let _permit = permit;
            let key = item.natural_key;

            let fetched =
                tokio::time::timeout(call_timeout, source.fetch_secondary(&key)).await;

            let write = match fetched {
                Ok(Ok(SecondaryFetch::Available(body))) => store
                    .set_secondary(kind, &key, SecondaryStatus::Available, Some(&body))
                    .await
                    .map(|_| ItemOutcome::Processed),
                Ok(Ok(SecondaryFetch::Unavailable)) => store
                    .set_secondary(kind, &key, SecondaryStatus::Unavailable, None)
                    .await
                    .map(|_| ItemOutcome::Unavailable),
                Ok(Err(e)) => {
                    warn!(%kind, key, error = ?e, "secondary fetch failed; marking unavailable");
                    store
                        .set_secondary(kind, &key, SecondaryStatus::Unavailable, None)
                        .await
                        .map(|_| ItemOutcome::Unavailable)
                }
                Err(_) => {
                    warn!(%kind, key, "secondary fetch timed out; marking unavailable");
                    store
                        .set_secondary(kind, &key, SecondaryStatus::Unavailable, None)
                        .await
                        .map(|_| ItemOutcome::Unavailable)
                }
            };

            match write {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(%kind, error = ?e, "secondary status write failed");
                    ItemOutcome::Failed
                }
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(ItemOutcome::Processed) => stats.processed += 1,
            Ok(ItemOutcome::Unavailable) => stats.unavailable += 1,
            Ok(ItemOutcome::Failed) | Err(_) => stats.failed += 1,
        }
    }

    counter!("enrich_processed_total").increment(stats.processed as u64);
    counter!("enrich_unavailable_total").increment(stats.unavailable as u64);
    Ok(stats)
}
