//! SQLite schema for the content store.

/// One append-only table per content kind (natural key unique), plus one
/// append-only digest table (compound id unique). Timestamps are RFC 3339
/// TEXT in UTC.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS youtube_videos (
    natural_key TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    primary_body TEXT NOT NULL,
    category TEXT,
    secondary_body TEXT,
    secondary_status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS openai_articles (
    natural_key TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    primary_body TEXT NOT NULL,
    category TEXT,
    secondary_body TEXT,
    secondary_status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS anthropic_articles (
    natural_key TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    primary_body TEXT NOT NULL,
    category TEXT,
    secondary_body TEXT,
    secondary_status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS digests (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    natural_key TEXT NOT NULL,
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_youtube_secondary_status ON youtube_videos(secondary_status);
CREATE INDEX IF NOT EXISTS idx_anthropic_secondary_status ON anthropic_articles(secondary_status);
CREATE INDEX IF NOT EXISTS idx_digests_created ON digests(created_at);
"#;
