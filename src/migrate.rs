//! Schema creation for the content database.
//!
//! Every statement is `IF NOT EXISTS`, so running `blogsync init` twice is
//! harmless. Timestamps are stored as INTEGER unix microseconds.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blogs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            domain TEXT NOT NULL COLLATE NOCASE UNIQUE,
            niche TEXT,
            description TEXT,
            wp_api_url TEXT,
            wp_credential_ref TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_posts (
            id TEXT PRIMARY KEY,
            blog_id TEXT NOT NULL,
            title TEXT NOT NULL CHECK (length(title) <= 500),
            slug TEXT,
            content TEXT NOT NULL DEFAULT '',
            excerpt TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            wordpress_post_id INTEGER,
            wordpress_slug TEXT,
            wordpress_link TEXT,
            word_count INTEGER NOT NULL DEFAULT 0,
            reading_time INTEGER NOT NULL DEFAULT 0,
            published_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced_at INTEGER,
            local_edited_at INTEGER,
            FOREIGN KEY (blog_id) REFERENCES blogs(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // NULL remote ids are distinct in SQLite, so local-only posts never collide.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_remote ON content_posts(blog_id, wordpress_post_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_assets (
            id TEXT PRIMARY KEY,
            blog_id TEXT NOT NULL,
            filename TEXT NOT NULL,
            url TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            alt_text TEXT,
            caption TEXT,
            size INTEGER NOT NULL DEFAULT 0,
            wordpress_media_id INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (blog_id) REFERENCES blogs(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_media_remote ON media_assets(blog_id, wordpress_media_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_logs (
            id TEXT PRIMARY KEY,
            blog_id TEXT NOT NULL,
            sync_type TEXT NOT NULL,
            status TEXT NOT NULL,
            details_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sync_logs_blog ON sync_logs(blog_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS main_keywords (
            id TEXT PRIMARY KEY,
            blog_id TEXT NOT NULL,
            keyword TEXT NOT NULL,
            search_volume INTEGER,
            difficulty REAL,
            cpc REAL,
            competition TEXT,
            search_intent TEXT,
            is_used INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (blog_id) REFERENCES blogs(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keyword_variations (
            id TEXT PRIMARY KEY,
            main_keyword_id TEXT NOT NULL,
            keyword TEXT NOT NULL,
            search_volume INTEGER,
            difficulty REAL,
            cpc REAL,
            competition TEXT,
            search_intent TEXT,
            is_used INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (main_keyword_id) REFERENCES main_keywords(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
