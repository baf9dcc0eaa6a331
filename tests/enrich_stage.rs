//! Enrichment stage behavior: per-item isolation, terminal unavailable
//! marking on fetch failure, and no reprocessing across runs.

use ai_news_digest::model::{ContentKind, RawItem, SecondaryStatus};
use ai_news_digest::pipeline::enrich::run_enrich;
use ai_news_digest::sources::{ContentSource, SecondaryFetch};
use ai_news_digest::store::ContentStore;
use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct MockSecondary {
    fetch_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ContentSource for MockSecondary {
    fn kind(&self) -> ContentKind {
        ContentKind::Youtube
    }

    fn name(&self) -> &'static str {
        "mock-youtube"
    }

    async fn fetch_recent(&self, _window_hours: i64) -> Result<Vec<RawItem>> {
        Ok(Vec::new())
    }

    async fn fetch_secondary(&self, natural_key: &str) -> Result<SecondaryFetch> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match natural_key {
            "ok" => Ok(SecondaryFetch::Available("a transcript".to_string())),
            "gone" => Ok(SecondaryFetch::Unavailable),
            _ => bail!("boom"),
        }
    }
}

struct StalledSecondary;

#[async_trait::async_trait]
impl ContentSource for StalledSecondary {
    fn kind(&self) -> ContentKind {
        ContentKind::Youtube
    }

    fn name(&self) -> &'static str {
        "stalled-youtube"
    }

    async fn fetch_recent(&self, _window_hours: i64) -> Result<Vec<RawItem>> {
        Ok(Vec::new())
    }

    async fn fetch_secondary(&self, _natural_key: &str) -> Result<SecondaryFetch> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(SecondaryFetch::Available("too late".to_string()))
    }
}

fn raw(key: &str) -> RawItem {
    RawItem {
        natural_key: key.to_string(),
        title: format!("video {key}"),
        url: format!("https://example.test/{key}"),
        published_at: Utc::now(),
        primary_body: "description".to_string(),
        category: None,
    }
}

async fn seeded_store(keys: &[&str]) -> ContentStore {
    let store = ContentStore::open_in_memory().await.unwrap();
    store.init_schema().await.unwrap();
    for key in keys {
        store
            .upsert_item(ContentKind::Youtube, &raw(key))
            .await
            .unwrap();
    }
    store
}

#[tokio::test]
async fn one_failing_item_never_aborts_the_batch() {
    let store = seeded_store(&["ok", "gone", "err"]).await;
    let source = Arc::new(MockSecondary {
        fetch_calls: AtomicUsize::new(0),
    });
    let shutdown = AtomicBool::new(false);

    let stats = run_enrich(
        &store,
        source.clone(),
        2,
        Duration::from_secs(5),
        None,
        &shutdown,
    )
    .await
    .unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.unavailable, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 3);

    let pending = store
        .items_missing_secondary(ContentKind::Youtube, None)
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn rerun_never_revisits_settled_items() {
    let store = seeded_store(&["ok", "err"]).await;
    let source = Arc::new(MockSecondary {
        fetch_calls: AtomicUsize::new(0),
    });
    let shutdown = AtomicBool::new(false);

    run_enrich(&store, source.clone(), 2, Duration::from_secs(5), None, &shutdown)
        .await
        .unwrap();
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 2);

    // Both items settled (available / terminal unavailable); nothing to do.
    let stats = run_enrich(&store, source.clone(), 2, Duration::from_secs(5), None, &shutdown)
        .await
        .unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn enriched_body_lands_on_the_item() {
    let store = seeded_store(&["ok"]).await;
    let source = Arc::new(MockSecondary {
        fetch_calls: AtomicUsize::new(0),
    });
    let shutdown = AtomicBool::new(false);

    run_enrich(&store, source, 1, Duration::from_secs(5), None, &shutdown)
        .await
        .unwrap();

    let ready = store.items_ready_for_digest(None).await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].secondary_status, SecondaryStatus::Available);
    assert_eq!(ready[0].digest_body(), "a transcript");
}

#[tokio::test]
async fn timed_out_fetch_is_marked_unavailable_like_any_failure() {
    let store = seeded_store(&["slow"]).await;
    let shutdown = AtomicBool::new(false);

    let stats = run_enrich(
        &store,
        Arc::new(StalledSecondary),
        1,
        Duration::from_millis(50),
        None,
        &shutdown,
    )
    .await
    .unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.processed, 0);
    assert_eq!(stats.unavailable, 1);
    assert_eq!(stats.failed, 0);

    // The timeout settled the item terminally; no retry on a later run.
    let pending = store
        .items_missing_secondary(ContentKind::Youtube, None)
        .await
        .unwrap();
    assert!(pending.is_empty());
    assert!(store.items_ready_for_digest(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_skips_items_not_yet_started() {
    let store = seeded_store(&["ok", "gone", "err"]).await;
    let source = Arc::new(MockSecondary {
        fetch_calls: AtomicUsize::new(0),
    });
    let shutdown = AtomicBool::new(true);

    let stats = run_enrich(&store, source.clone(), 1, Duration::from_secs(5), None, &shutdown)
        .await
        .unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 0);
}
