//! Persistent content store (SQLite).
//!
//! Owns every `ContentItem` and `DigestRecord` row; all other components work
//! on copies. Upserts and digest creation are idempotent via uniqueness
//! constraints with conflict-ignore, so concurrent workers never create
//! duplicate rows for the same key. Every mutation commits per call.

mod schema;

pub use schema::SCHEMA_SQL;

use crate::model::{digest_id, ContentItem, ContentKind, DigestRecord, RawItem, SecondaryStatus};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, FromRow)]
struct ItemRow {
    natural_key: String,
    title: String,
    url: String,
    published_at: String,
    primary_body: String,
    category: Option<String>,
    secondary_body: Option<String>,
    secondary_status: String,
    created_at: String,
}

impl ItemRow {
    fn into_item(self, kind: ContentKind) -> Result<ContentItem> {
        Ok(ContentItem {
            kind,
            natural_key: self.natural_key,
            title: self.title,
            url: self.url,
            published_at: parse_ts(&self.published_at)?,
            primary_body: self.primary_body,
            category: self.category,
            secondary_body: self.secondary_body,
            secondary_status: SecondaryStatus::from_str(&self.secondary_status)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct DigestRow {
    id: String,
    kind: String,
    natural_key: String,
    title: String,
    summary: String,
    url: String,
    published_at: String,
    created_at: String,
}

impl DigestRow {
    fn into_record(self) -> Result<DigestRecord> {
        Ok(DigestRecord {
            id: self.id,
            kind: ContentKind::from_str(&self.kind)?,
            natural_key: self.natural_key,
            title: self.title,
            summary: self.summary,
            url: self.url,
            published_at: parse_ts(&self.published_at)?,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("parsing stored timestamp {s:?}"))?
        .with_timezone(&Utc))
}

/// Handle to the SQLite-backed content store. Cheap to clone.
#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
}

impl ContentStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("opening content store at {}", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("connecting to sqlite store")?;

        Ok(Self { pool })
    }

    /// Open a transient in-memory store. A single connection keeps every
    /// caller on the same database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("connecting to in-memory sqlite store")?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("initializing store schema")?;
        Ok(())
    }

    /// Direct pool access for maintenance tasks and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn insert_sql(kind: ContentKind) -> String {
        format!(
            "INSERT INTO {} \
             (natural_key, title, url, published_at, primary_body, category, \
              secondary_body, secondary_status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?) \
             ON CONFLICT(natural_key) DO NOTHING",
            kind.table()
        )
    }

    fn initial_status(kind: ContentKind) -> SecondaryStatus {
        if kind.requires_secondary() {
            SecondaryStatus::Missing
        } else {
            SecondaryStatus::Available
        }
    }

    /// Insert an item on first sighting. Returns the stored record and
    /// whether this call created it; a duplicate key never mutates the
    /// existing row.
    pub async fn upsert_item(
        &self,
        kind: ContentKind,
        item: &RawItem,
    ) -> Result<(ContentItem, bool)> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query(&Self::insert_sql(kind))
            .bind(&item.natural_key)
            .bind(&item.title)
            .bind(&item.url)
            .bind(item.published_at.to_rfc3339())
            .bind(&item.primary_body)
            .bind(&item.category)
            .bind(Self::initial_status(kind).as_str())
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT * FROM {} WHERE natural_key = ?",
            kind.table()
        ))
        .bind(&item.natural_key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((row.into_item(kind)?, created))
    }

    /// Insert a batch of items in one transaction; returns how many were new.
    pub async fn bulk_upsert(&self, kind: ContentKind, items: &[RawItem]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let sql = Self::insert_sql(kind);
        let mut tx = self.pool.begin().await?;
        let mut created = 0usize;

        for item in items {
            let affected = sqlx::query(&sql)
                .bind(&item.natural_key)
                .bind(&item.title)
                .bind(&item.url)
                .bind(item.published_at.to_rfc3339())
                .bind(&item.primary_body)
                .bind(&item.category)
                .bind(Self::initial_status(kind).as_str())
                .bind(&now)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            created += affected as usize;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Items of the given kind still waiting for their secondary body.
    /// Items marked `unavailable` are terminal and never come back here.
    pub async fn items_missing_secondary(
        &self,
        kind: ContentKind,
        limit: Option<i64>,
    ) -> Result<Vec<ContentItem>> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE secondary_status = 'missing' ORDER BY published_at DESC",
            kind.table()
        );
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let rows = sqlx::query_as::<_, ItemRow>(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.into_item(kind)).collect()
    }

    /// Record the outcome of a secondary fetch. Only rows still in `missing`
    /// status are touched, so a terminal `unavailable` is never revisited and
    /// re-setting it is a no-op.
    pub async fn set_secondary(
        &self,
        kind: ContentKind,
        natural_key: &str,
        status: SecondaryStatus,
        body: Option<&str>,
    ) -> Result<()> {
        let body = match status {
            SecondaryStatus::Missing => bail!("cannot reset an item to missing"),
            SecondaryStatus::Available => {
                Some(body.context("available status requires a secondary body")?)
            }
            SecondaryStatus::Unavailable => None,
        };

        sqlx::query(&format!(
            "UPDATE {} SET secondary_status = ?, secondary_body = ? \
             WHERE natural_key = ? AND secondary_status = 'missing'",
            kind.table()
        ))
        .bind(status.as_str())
        .bind(body)
        .bind(natural_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All digest ids currently persisted, as one bulk set.
    pub async fn digest_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM digests")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Items whose secondary requirement is satisfied and which have no
    /// digest yet. Computed as a set-difference against all existing digest
    /// ids in bulk; per-item existence checks would degrade as the archive
    /// grows.
    pub async fn items_ready_for_digest(&self, limit: Option<usize>) -> Result<Vec<ContentItem>> {
        let seen = self.digest_ids().await?;
        let mut out = Vec::new();

        for kind in ContentKind::ALL {
            let rows = sqlx::query_as::<_, ItemRow>(&format!(
                "SELECT * FROM {} WHERE secondary_status = 'available' \
                 ORDER BY published_at DESC",
                kind.table()
            ))
            .fetch_all(&self.pool)
            .await?;

            for row in rows {
                if seen.contains(&digest_id(kind, &row.natural_key)) {
                    continue;
                }
                out.push(row.into_item(kind)?);
            }
        }

        if let Some(n) = limit {
            out.truncate(n);
        }
        Ok(out)
    }

    /// Create a digest record; idempotent by compound id. A duplicate create
    /// returns the existing record with `created = false`.
    pub async fn create_digest(
        &self,
        kind: ContentKind,
        natural_key: &str,
        url: &str,
        title: &str,
        summary: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(DigestRecord, bool)> {
        let id = digest_id(kind, natural_key);
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query(
            "INSERT INTO digests (id, kind, natural_key, title, summary, url, published_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(&id)
        .bind(kind.as_str())
        .bind(natural_key)
        .bind(title)
        .bind(summary)
        .bind(url)
        .bind(published_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let row = sqlx::query_as::<_, DigestRow>("SELECT * FROM digests WHERE id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((row.into_record()?, created))
    }

    /// Digests created within the last `window_hours`, newest first.
    pub async fn recent_digests(&self, window_hours: i64) -> Result<Vec<DigestRecord>> {
        let cutoff = (Utc::now() - Duration::hours(window_hours)).to_rfc3339();
        let rows = sqlx::query_as::<_, DigestRow>(
            "SELECT * FROM digests WHERE created_at >= ? ORDER BY created_at DESC",
        )
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DigestRow::into_record).collect()
    }

    /// Row count for one kind's table.
    pub async fn count_items(&self, kind: ContentKind) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
