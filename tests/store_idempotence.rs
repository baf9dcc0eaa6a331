//! Store-level invariants: idempotent upserts, terminal unavailable status,
//! digest creation by compound id, and the ready-for-digest set-difference.

use ai_news_digest::model::{ContentKind, RawItem, SecondaryStatus};
use ai_news_digest::store::ContentStore;
use chrono::{Duration, Utc};

fn raw(key: &str, title: &str) -> RawItem {
    RawItem {
        natural_key: key.to_string(),
        title: title.to_string(),
        url: format!("https://example.test/{key}"),
        published_at: Utc::now(),
        primary_body: format!("body of {key}"),
        category: None,
    }
}

async fn store() -> ContentStore {
    let store = ContentStore::open_in_memory().await.unwrap();
    store.init_schema().await.unwrap();
    store
}

#[tokio::test]
async fn duplicate_upsert_keeps_the_original_row() {
    let store = store().await;

    let (item, created) = store
        .upsert_item(ContentKind::Openai, &raw("a1", "First title"))
        .await
        .unwrap();
    assert!(created);
    assert_eq!(item.title, "First title");
    assert_eq!(item.secondary_status, SecondaryStatus::Available);

    // A re-sighting with different fields never mutates the stored row.
    let (again, created) = store
        .upsert_item(ContentKind::Openai, &raw("a1", "Changed title"))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.title, "First title");
    assert_eq!(store.count_items(ContentKind::Openai).await.unwrap(), 1);
}

#[tokio::test]
async fn bulk_upsert_counts_only_new_rows() {
    let store = store().await;
    store
        .upsert_item(ContentKind::Youtube, &raw("v1", "Existing"))
        .await
        .unwrap();

    let batch = vec![raw("v1", "Existing"), raw("v2", "New"), raw("v3", "New too")];
    let created = store.bulk_upsert(ContentKind::Youtube, &batch).await.unwrap();
    assert_eq!(created, 2);
    assert_eq!(store.count_items(ContentKind::Youtube).await.unwrap(), 3);
}

#[tokio::test]
async fn kinds_with_secondary_requirement_start_missing() {
    let store = store().await;

    let (yt, _) = store
        .upsert_item(ContentKind::Youtube, &raw("v1", "Video"))
        .await
        .unwrap();
    assert_eq!(yt.secondary_status, SecondaryStatus::Missing);

    let (oa, _) = store
        .upsert_item(ContentKind::Openai, &raw("a1", "Article"))
        .await
        .unwrap();
    assert_eq!(oa.secondary_status, SecondaryStatus::Available);
}

#[tokio::test]
async fn unavailable_is_terminal() {
    let store = store().await;
    store
        .upsert_item(ContentKind::Youtube, &raw("v1", "Video"))
        .await
        .unwrap();

    store
        .set_secondary(ContentKind::Youtube, "v1", SecondaryStatus::Unavailable, None)
        .await
        .unwrap();

    // A later successful fetch must not resurrect the item.
    store
        .set_secondary(
            ContentKind::Youtube,
            "v1",
            SecondaryStatus::Available,
            Some("late transcript"),
        )
        .await
        .unwrap();

    let pending = store
        .items_missing_secondary(ContentKind::Youtube, None)
        .await
        .unwrap();
    assert!(pending.is_empty());

    let ready = store.items_ready_for_digest(None).await.unwrap();
    assert!(ready.is_empty());
}

#[tokio::test]
async fn resetting_to_missing_is_rejected() {
    let store = store().await;
    store
        .upsert_item(ContentKind::Youtube, &raw("v1", "Video"))
        .await
        .unwrap();

    let err = store
        .set_secondary(ContentKind::Youtube, "v1", SecondaryStatus::Missing, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn digest_creation_is_idempotent_by_compound_id() {
    let store = store().await;
    let published = Utc::now();

    let (first, created) = store
        .create_digest(
            ContentKind::Youtube,
            "abc123",
            "https://example.test/v",
            "Title",
            "Summary.",
            published,
        )
        .await
        .unwrap();
    assert!(created);
    assert_eq!(first.id, "youtube:abc123");

    let (second, created) = store
        .create_digest(
            ContentKind::Youtube,
            "abc123",
            "https://example.test/v",
            "Other title",
            "Other summary.",
            published,
        )
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(second.title, "Title");
    assert_eq!(store.digest_ids().await.unwrap().len(), 1);
}

#[tokio::test]
async fn ready_for_digest_excludes_missing_and_already_digested() {
    let store = store().await;

    store
        .upsert_item(ContentKind::Openai, &raw("a1", "Article"))
        .await
        .unwrap();
    store
        .upsert_item(ContentKind::Youtube, &raw("v1", "Video pending"))
        .await
        .unwrap();
    store
        .upsert_item(ContentKind::Youtube, &raw("v2", "Video enriched"))
        .await
        .unwrap();
    store
        .set_secondary(
            ContentKind::Youtube,
            "v2",
            SecondaryStatus::Available,
            Some("transcript"),
        )
        .await
        .unwrap();

    let ready = store.items_ready_for_digest(None).await.unwrap();
    let mut ids: Vec<String> = ready.iter().map(|i| i.digest_id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["openai:a1", "youtube:v2"]);

    // The enriched item's digest body prefers the secondary text.
    let v2 = ready.iter().find(|i| i.natural_key == "v2").unwrap();
    assert_eq!(v2.digest_body(), "transcript");

    store
        .create_digest(
            ContentKind::Openai,
            "a1",
            "https://example.test/a1",
            "T",
            "S.",
            Utc::now(),
        )
        .await
        .unwrap();
    let ready = store.items_ready_for_digest(None).await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].digest_id(), "youtube:v2");
}

#[tokio::test]
async fn recent_digests_respects_the_window_and_orders_newest_first() {
    let store = store().await;

    store
        .create_digest(
            ContentKind::Openai,
            "old",
            "https://example.test/old",
            "Old",
            "S.",
            Utc::now(),
        )
        .await
        .unwrap();
    store
        .create_digest(
            ContentKind::Openai,
            "new",
            "https://example.test/new",
            "New",
            "S.",
            Utc::now(),
        )
        .await
        .unwrap();

    // Push one record outside the window.
    let backdated = (Utc::now() - Duration::hours(48)).to_rfc3339();
    sqlx::query("UPDATE digests SET created_at = ? WHERE id = ?")
        .bind(&backdated)
        .bind("openai:old")
        .execute(store.pool())
        .await
        .unwrap();

    let recent = store.recent_digests(24).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, "openai:new");

    let wide = store.recent_digests(72).await.unwrap();
    assert_eq!(wide.len(), 2);
    assert_eq!(wide[0].id, "openai:new");
    assert_eq!(wide[1].id, "openai:old");
}
