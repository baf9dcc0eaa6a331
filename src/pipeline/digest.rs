//! Digest stage: summarize every enrichment-complete item that has no
//! digest record yet.
//!
//! Summarizer failures are skipped and counted without writing a placeholder.
//! Unlike enrichment there is no sentinel here: the underlying content is
//! unchanged, so a failed item is simply retried on the next run.

use crate::ai::Summarizer;
use crate::store::ContentStore;
use anyhow::Result;
use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Cap on summarizer input; transcripts can run far past the model context.
const MAX_INPUT_CHARS: usize = 8000;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DigestStats {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

pub async fn run_digest(
    store: &ContentStore,
    summarizer: Arc<dyn Summarizer>,
    concurrency: usize,
    call_timeout: Duration,
    limit: Option<usize>,
    shutdown: &AtomicBool,
) -> Result<DigestStats> {
    let items = store.items_ready_for_digest(limit).await?;

    let mut stats = DigestStats {
        total: items.len(),
        ..DigestStats::default()
    };

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for item in items {
        if shutdown.load(Ordering::Relaxed) {
            stats.total -= 1;
            continue;
        }

        let permit = semaphore.clone().acquire_owned().await?;
        let summarizer = summarizer.clone();
        let store = store.clone();
        set.spawn(async move {
            let _permit = permit;

            let body: String = item.digest_body().chars().take(MAX_INPUT_CHARS).collect();
            let summarized = tokio::time::timeout(
                call_timeout,
                summarizer.summarize(&item.title, &body, item.kind),
            )
            .await;

            let output = match summarized {
                Ok(Ok(out)) => out,
                Ok(Err(e)) => {
                    warn!(kind = %item.kind, key = item.natural_key, error = ?e, "summarize failed");
                    return false;
                }
                Err(_) => {
                    warn!(kind = %item.kind, key = item.natural_key, "summarize timed out");
                    return false;
                }
            };

            match store
                .create_digest(
                    item.kind,
                    &item.natural_key,
                    &item.url,
                    &output.title,
                    &output.summary,
                    item.published_at,
                )
                .await
            {
                Ok((record, created)) => {
                    if created {
                        info!(id = %record.id, title = %record.title, "digest created");
                    }
                    true
                }
                Err(e) => {
                    warn!(kind = %item.kind, key = item.natural_key, error = ?e, "digest write failed");
                    false
                }
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(true) => stats.processed += 1,
            Ok(false) | Err(_) => stats.failed += 1,
        }
    }

    counter!("digest_processed_total").increment(stats.processed as u64);
    counter!("digest_failed_total").increment(stats.failed as u64);
    Ok(stats)
}
