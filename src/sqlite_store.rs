//! SQLite-backed [`ContentStore`].
//!
//! The schema (see [`migrate`](crate::migrate)) carries the uniqueness and
//! title-length rules, so constraint violations surface here as sqlx errors
//! and reach callers as ordinary `anyhow` failures.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use blogsync_core::models::{
    Blog, BlogFilter, BlogStats, BlogUpdate, ContentPost, KeywordMetrics, KeywordVariation,
    MainKeyword, MediaAsset, MediaSnapshot, NewBlog, NewKeyword, NewPost, NewSyncLog, PostEdit,
    PostSnapshot, RemoteLink, SyncLogEntry, SyncLogStatus,
};
use blogsync_core::status::PostStatus;
use blogsync_core::store::{check_title, ContentStore};
use blogsync_core::text::{reading_time, word_count};

use crate::config::Config;
use crate::{db, migrate};

const POST_COLUMNS: &str = "id, blog_id, title, slug, content, excerpt, status, wordpress_post_id, \
    wordpress_slug, wordpress_link, word_count, reading_time, published_at, created_at, \
    updated_at, synced_at, local_edited_at";

const MEDIA_COLUMNS: &str = "id, blog_id, filename, url, mime_type, alt_text, caption, size, \
    wordpress_media_id, created_at, updated_at";

const BLOG_COLUMNS: &str = "id, name, domain, niche, description, wp_api_url, wp_credential_ref, \
    is_active, created_at, updated_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and bring its schema up to date.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn post_by_id(&self, id: &str) -> Result<Option<ContentPost>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM content_posts WHERE id = ?",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn media_by_id(&self, id: &str) -> Result<Option<MediaAsset>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM media_assets WHERE id = ?",
            MEDIA_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(media_from_row).transpose()
    }

    async fn variations_for(&self, main_keyword_id: &str) -> Result<Vec<KeywordVariation>> {
        let rows = sqlx::query(
            "SELECT id, main_keyword_id, keyword, search_volume, difficulty, cpc, competition, \
             search_intent, is_used FROM keyword_variations WHERE main_keyword_id = ? \
             ORDER BY position ASC",
        )
        .bind(main_keyword_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| KeywordVariation {
                id: row.get("id"),
                main_keyword_id: row.get("main_keyword_id"),
                keyword: row.get("keyword"),
                metrics: metrics_from_row(row),
                is_used: row.get::<i64, _>("is_used") != 0,
            })
            .collect())
    }
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| anyhow!("timestamp out of range: {}", micros))
}

fn opt_from_micros(micros: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    micros.map(from_micros).transpose()
}

fn blog_from_row(row: &SqliteRow) -> Result<Blog> {
    Ok(Blog {
        id: row.get("id"),
        name: row.get("name"),
        domain: row.get("domain"),
        niche: row.get("niche"),
        description: row.get("description"),
        wp_api_url: row.get("wp_api_url"),
        wp_credential_ref: row.get("wp_credential_ref"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: from_micros(row.get("created_at"))?,
        updated_at: from_micros(row.get("updated_at"))?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<ContentPost> {
    let status: String = row.get("status");
    Ok(ContentPost {
        id: row.get("id"),
        blog_id: row.get("blog_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        status: status
            .parse::<PostStatus>()
            .context("bad status in content_posts row")?,
        wordpress_post_id: row.get("wordpress_post_id"),
        wordpress_slug: row.get("wordpress_slug"),
        wordpress_link: row.get("wordpress_link"),
        word_count: row.get("word_count"),
        reading_time: row.get("reading_time"),
        published_at: opt_from_micros(row.get("published_at"))?,
        created_at: from_micros(row.get("created_at"))?,
        updated_at: from_micros(row.get("updated_at"))?,
        synced_at: opt_from_micros(row.get("synced_at"))?,
        local_edited_at: opt_from_micros(row.get("local_edited_at"))?,
    })
}

fn media_from_row(row: &SqliteRow) -> Result<MediaAsset> {
    Ok(MediaAsset {
        id: row.get("id"),
        blog_id: row.get("blog_id"),
        filename: row.get("filename"),
        url: row.get("url"),
        mime_type: row.get("mime_type"),
        alt_text: row.get("alt_text"),
        caption: row.get("caption"),
        size: row.get("size"),
        wordpress_media_id: row.get("wordpress_media_id"),
        created_at: from_micros(row.get("created_at"))?,
        updated_at: from_micros(row.get("updated_at"))?,
    })
}

fn log_from_row(row: &SqliteRow) -> Result<SyncLogEntry> {
    let status: String = row.get("status");
    let details_json: String = row.get("details_json");
    Ok(SyncLogEntry {
        id: row.get("id"),
        blog_id: row.get("blog_id"),
        sync_type: row.get("sync_type"),
        status: status.parse::<SyncLogStatus>().map_err(|e| anyhow!(e))?,
        details: serde_json::from_str(&details_json).unwrap_or(serde_json::json!({})),
        created_at: from_micros(row.get("created_at"))?,
    })
}

fn metrics_from_row(row: &SqliteRow) -> KeywordMetrics {
    KeywordMetrics {
        search_volume: row.get("search_volume"),
        difficulty: row.get("difficulty"),
        cpc: row.get("cpc"),
        competition: row.get("competition"),
        search_intent: row.get("search_intent"),
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn create_blog(&self, blog: &NewBlog) -> Result<Blog> {
        let id = Uuid::new_v4().to_string();
        let now = to_micros(Utc::now());
        sqlx::query(
            "INSERT INTO blogs (id, name, domain, niche, description, wp_api_url, \
             wp_credential_ref, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&id)
        .bind(&blog.name)
        .bind(&blog.domain)
        .bind(&blog.niche)
        .bind(&blog.description)
        .bind(&blog.wp_api_url)
        .bind(&blog.wp_credential_ref)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create blog '{}'", blog.domain))?;

        self.get_blog(&id)
            .await?
            .ok_or_else(|| anyhow!("blog {} vanished after insert", id))
    }

    async fn get_blog(&self, id: &str) -> Result<Option<Blog>> {
        let row = sqlx::query(&format!("SELECT {} FROM blogs WHERE id = ?", BLOG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(blog_from_row).transpose()
    }

    async fn find_blog_by_domain(&self, domain: &str) -> Result<Option<Blog>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM blogs WHERE domain = ? COLLATE NOCASE",
            BLOG_COLUMNS
        ))
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(blog_from_row).transpose()
    }

    async fn list_blogs(&self, filter: &BlogFilter) -> Result<Vec<Blog>> {
        let mut sql = format!("SELECT {} FROM blogs WHERE 1 = 1", BLOG_COLUMNS);
        if filter.active_only {
            sql.push_str(" AND is_active = 1");
        }
        if filter.domain.is_some() {
            sql.push_str(" AND domain = ? COLLATE NOCASE");
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut query = sqlx::query(&sql);
        if let Some(domain) = &filter.domain {
            query = query.bind(domain);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(blog_from_row).collect()
    }

    async fn update_blog(&self, id: &str, update: &BlogUpdate) -> Result<Option<Blog>> {
        let Some(mut blog) = self.get_blog(id).await? else {
            return Ok(None);
        };
        update.apply_to(&mut blog);
        blog.updated_at = Utc::now();

        sqlx::query(
            "UPDATE blogs SET name = ?, niche = ?, description = ?, wp_api_url = ?, \
             wp_credential_ref = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&blog.name)
        .bind(&blog.niche)
        .bind(&blog.description)
        .bind(&blog.wp_api_url)
        .bind(&blog.wp_credential_ref)
        .bind(to_micros(blog.updated_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(blog))
    }

    async fn set_blog_active(&self, id: &str, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE blogs SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active as i64)
            .bind(to_micros(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, post: &NewPost) -> Result<ContentPost> {
        check_title(&post.title)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let words = word_count(&post.content);
        let published_at = (post.status == PostStatus::Published).then(|| to_micros(now));

        sqlx::query(
            "INSERT INTO content_posts (id, blog_id, title, slug, content, excerpt, status, \
             word_count, reading_time, published_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&post.blog_id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(post.status.as_str())
        .bind(words)
        .bind(reading_time(words))
        .bind(published_at)
        .bind(to_micros(now))
        .bind(to_micros(now))
        .execute(&self.pool)
        .await?;

        self.post_by_id(&id)
            .await?
            .ok_or_else(|| anyhow!("post {} vanished after insert", id))
    }

    async fn get_post(&self, id: &str) -> Result<Option<ContentPost>> {
        self.post_by_id(id).await
    }

    async fn edit_post(&self, id: &str, edit: &PostEdit) -> Result<Option<ContentPost>> {
        let Some(mut post) = self.post_by_id(id).await? else {
            return Ok(None);
        };
        if let Some(title) = &edit.title {
            check_title(title)?;
            post.title = title.clone();
        }
        if let Some(content) = &edit.content {
            post.content = content.clone();
            post.word_count = word_count(content);
            post.reading_time = reading_time(post.word_count);
        }
        if let Some(excerpt) = &edit.excerpt {
            post.excerpt = Some(excerpt.clone());
        }
        if let Some(status) = edit.status {
            post.status = status;
        }
        let now = Utc::now();
        post.updated_at = now;
        post.local_edited_at = Some(now);

        sqlx::query(
            "UPDATE content_posts SET title = ?, content = ?, excerpt = ?, status = ?, \
             word_count = ?, reading_time = ?, updated_at = ?, local_edited_at = ? WHERE id = ?",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(post.status.as_str())
        .bind(post.word_count)
        .bind(post.reading_time)
        .bind(to_micros(now))
        .bind(to_micros(now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(post))
    }

    async fn list_posts(&self, blog_id: &str) -> Result<Vec<ContentPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM content_posts WHERE blog_id = ? ORDER BY created_at ASC, rowid ASC",
            POST_COLUMNS
        ))
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(post_from_row).collect()
    }

    async fn find_post_by_remote_id(
        &self,
        blog_id: &str,
        wordpress_post_id: i64,
    ) -> Result<Option<ContentPost>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM content_posts WHERE blog_id = ? AND wordpress_post_id = ?",
            POST_COLUMNS
        ))
        .bind(blog_id)
        .bind(wordpress_post_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn insert_remote_post(
        &self,
        blog_id: &str,
        snapshot: &PostSnapshot,
    ) -> Result<ContentPost> {
        check_title(&snapshot.title)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO content_posts (id, blog_id, title, slug, content, excerpt, status, \
             wordpress_post_id, wordpress_slug, wordpress_link, word_count, reading_time, \
             published_at, created_at, updated_at, synced_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(blog_id)
        .bind(&snapshot.title)
        .bind(&snapshot.wordpress_slug)
        .bind(&snapshot.content)
        .bind(&snapshot.excerpt)
        .bind(snapshot.status.as_str())
        .bind(snapshot.wordpress_post_id)
        .bind(&snapshot.wordpress_slug)
        .bind(&snapshot.wordpress_link)
        .bind(snapshot.word_count)
        .bind(snapshot.reading_time)
        .bind(snapshot.published_at.map(to_micros))
        .bind(to_micros(snapshot.created_at))
        .bind(to_micros(snapshot.updated_at))
        .bind(to_micros(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.post_by_id(&id)
            .await?
            .ok_or_else(|| anyhow!("post {} vanished after insert", id))
    }

    async fn update_remote_post(
        &self,
        post_id: &str,
        snapshot: &PostSnapshot,
    ) -> Result<ContentPost> {
        check_title(&snapshot.title)?;
        let result = sqlx::query(
            "UPDATE content_posts SET title = ?, content = ?, excerpt = ?, status = ?, \
             wordpress_post_id = ?, wordpress_slug = ?, wordpress_link = ?, word_count = ?, \
             reading_time = ?, published_at = ?, created_at = ?, updated_at = ?, synced_at = ? \
             WHERE id = ?",
        )
        .bind(&snapshot.title)
        .bind(&snapshot.content)
        .bind(&snapshot.excerpt)
        .bind(snapshot.status.as_str())
        .bind(snapshot.wordpress_post_id)
        .bind(&snapshot.wordpress_slug)
        .bind(&snapshot.wordpress_link)
        .bind(snapshot.word_count)
        .bind(snapshot.reading_time)
        .bind(snapshot.published_at.map(to_micros))
        .bind(to_micros(snapshot.created_at))
        .bind(to_micros(snapshot.updated_at))
        .bind(to_micros(Utc::now()))
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("post not found: {}", post_id);
        }
        self.post_by_id(post_id)
            .await?
            .ok_or_else(|| anyhow!("post not found: {}", post_id))
    }

    async fn record_push(&self, post_id: &str, link: &RemoteLink) -> Result<()> {
        let now = to_micros(Utc::now());
        let result = sqlx::query(
            "UPDATE content_posts SET wordpress_post_id = ?, wordpress_slug = ?, \
             wordpress_link = ?, updated_at = ?, synced_at = ? WHERE id = ?",
        )
        .bind(link.wordpress_post_id)
        .bind(&link.wordpress_slug)
        .bind(&link.wordpress_link)
        .bind(now)
        .bind(now)
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("post not found: {}", post_id);
        }
        Ok(())
    }

    async fn mark_post_deleted(&self, blog_id: &str, wordpress_post_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE content_posts SET status = ? WHERE blog_id = ? AND wordpress_post_id = ?",
        )
        .bind(PostStatus::Deleted.as_str())
        .bind(blog_id)
        .bind(wordpress_post_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_media_by_remote_id(
        &self,
        blog_id: &str,
        wordpress_media_id: i64,
    ) -> Result<Option<MediaAsset>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM media_assets WHERE blog_id = ? AND wordpress_media_id = ?",
            MEDIA_COLUMNS
        ))
        .bind(blog_id)
        .bind(wordpress_media_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(media_from_row).transpose()
    }

    async fn insert_remote_media(
        &self,
        blog_id: &str,
        snapshot: &MediaSnapshot,
    ) -> Result<MediaAsset> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO media_assets (id, blog_id, filename, url, mime_type, alt_text, caption, \
             size, wordpress_media_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(blog_id)
        .bind(&snapshot.filename)
        .bind(&snapshot.url)
        .bind(&snapshot.mime_type)
        .bind(&snapshot.alt_text)
        .bind(&snapshot.caption)
        .bind(snapshot.size)
        .bind(snapshot.wordpress_media_id)
        .bind(to_micros(snapshot.created_at))
        .bind(to_micros(snapshot.updated_at))
        .execute(&self.pool)
        .await?;

        self.media_by_id(&id)
            .await?
            .ok_or_else(|| anyhow!("media {} vanished after insert", id))
    }

    async fn update_remote_media(
        &self,
        media_id: &str,
        snapshot: &MediaSnapshot,
    ) -> Result<MediaAsset> {
        let result = sqlx::query(
            "UPDATE media_assets SET filename = ?, url = ?, mime_type = ?, alt_text = ?, \
             caption = ?, size = ?, wordpress_media_id = ?, created_at = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&snapshot.filename)
        .bind(&snapshot.url)
        .bind(&snapshot.mime_type)
        .bind(&snapshot.alt_text)
        .bind(&snapshot.caption)
        .bind(snapshot.size)
        .bind(snapshot.wordpress_media_id)
        .bind(to_micros(snapshot.created_at))
        .bind(to_micros(snapshot.updated_at))
        .bind(media_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("media not found: {}", media_id);
        }
        self.media_by_id(media_id)
            .await?
            .ok_or_else(|| anyhow!("media not found: {}", media_id))
    }

    async fn append_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry> {
        let created = SyncLogEntry {
            id: Uuid::new_v4().to_string(),
            blog_id: entry.blog_id.clone(),
            sync_type: entry.sync_type.clone(),
            status: entry.status,
            details: entry.details.clone(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO sync_logs (id, blog_id, sync_type, status, details_json, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(&created.blog_id)
        .bind(&created.sync_type)
        .bind(created.status.as_str())
        .bind(serde_json::to_string(&created.details)?)
        .bind(to_micros(created.created_at))
        .execute(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_sync_logs(
        &self,
        blog_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, blog_id, sync_type, status, details_json, created_at FROM sync_logs \
             WHERE blog_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(blog_id)
        .bind(limit.max(0))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(log_from_row).collect()
    }

    async fn create_keyword(&self, keyword: &NewKeyword) -> Result<MainKeyword> {
        let main_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO main_keywords (id, blog_id, keyword, search_volume, difficulty, cpc, \
             competition, search_intent, is_used, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&main_id)
        .bind(&keyword.blog_id)
        .bind(&keyword.keyword)
        .bind(keyword.metrics.search_volume)
        .bind(keyword.metrics.difficulty)
        .bind(keyword.metrics.cpc)
        .bind(&keyword.metrics.competition)
        .bind(&keyword.metrics.search_intent)
        .bind(to_micros(now))
        .execute(&mut *tx)
        .await?;

        let mut variations = Vec::with_capacity(keyword.variations.len());
        for (position, variation) in keyword.variations.iter().enumerate() {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO keyword_variations (id, main_keyword_id, keyword, search_volume, \
                 difficulty, cpc, competition, search_intent, is_used, position) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(&id)
            .bind(&main_id)
            .bind(&variation.keyword)
            .bind(variation.metrics.search_volume)
            .bind(variation.metrics.difficulty)
            .bind(variation.metrics.cpc)
            .bind(&variation.metrics.competition)
            .bind(&variation.metrics.search_intent)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;

            variations.push(KeywordVariation {
                id,
                main_keyword_id: main_id.clone(),
                keyword: variation.keyword.clone(),
                metrics: variation.metrics.clone(),
                is_used: false,
            });
        }

        tx.commit().await?;

        Ok(MainKeyword {
            id: main_id,
            blog_id: keyword.blog_id.clone(),
            keyword: keyword.keyword.clone(),
            metrics: keyword.metrics.clone(),
            is_used: false,
            created_at: from_micros(to_micros(now))?,
            variations,
        })
    }

    async fn list_keywords(&self, blog_id: &str) -> Result<Vec<MainKeyword>> {
        let rows = sqlx::query(
            "SELECT id, blog_id, keyword, search_volume, difficulty, cpc, competition, \
             search_intent, is_used, created_at FROM main_keywords WHERE blog_id = ? \
             ORDER BY search_volume IS NULL, search_volume DESC, rowid ASC",
        )
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let variations = self.variations_for(&id).await?;
            out.push(MainKeyword {
                id,
                blog_id: row.get("blog_id"),
                keyword: row.get("keyword"),
                metrics: metrics_from_row(row),
                is_used: row.get::<i64, _>("is_used") != 0,
                created_at: from_micros(row.get("created_at"))?,
                variations,
            });
        }
        Ok(out)
    }

    async fn blog_stats(&self, blog_id: &str) -> Result<Option<BlogStats>> {
        let Some(blog) = self.get_blog(blog_id).await? else {
            return Ok(None);
        };

        let status_rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM content_posts WHERE blog_id = ? GROUP BY status",
        )
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await?;

        let mut posts_by_status = BTreeMap::new();
        let mut posts_total = 0;
        for row in &status_rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            posts_total += count;
            posts_by_status.insert(status, count);
        }

        let posts_linked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM content_posts WHERE blog_id = ? AND wordpress_post_id IS NOT NULL",
        )
        .bind(blog_id)
        .fetch_one(&self.pool)
        .await?;

        let media_total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM media_assets WHERE blog_id = ?")
                .bind(blog_id)
                .fetch_one(&self.pool)
                .await?;

        let keyword_row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(is_used), 0) AS used \
             FROM main_keywords WHERE blog_id = ?",
        )
        .bind(blog_id)
        .fetch_one(&self.pool)
        .await?;

        let variations_total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM keyword_variations v \
             JOIN main_keywords k ON k.id = v.main_keyword_id WHERE k.blog_id = ?",
        )
        .bind(blog_id)
        .fetch_one(&self.pool)
        .await?;

        let last_sync = self.list_sync_logs(blog_id, 1, 0).await?.into_iter().next();

        Ok(Some(BlogStats {
            blog_id: blog.id,
            blog_name: blog.name,
            domain: blog.domain,
            posts_total,
            posts_by_status,
            posts_linked,
            media_total,
            keywords_total: keyword_row.get("total"),
            keywords_used: keyword_row.get("used"),
            variations_total,
            last_sync,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogsync_core::models::NewVariation;
    use chrono::Duration;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        (tmp, SqliteStore::new(pool))
    }

    async fn blog(store: &SqliteStore) -> Blog {
        store
            .create_blog(&NewBlog {
                name: "Garden Notes".into(),
                domain: "garden.example.com".into(),
                wp_api_url: Some("https://garden.example.com".into()),
                wp_credential_ref: Some("garden".into()),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn snapshot(remote_id: i64, title: &str) -> PostSnapshot {
        let now = Utc::now() - Duration::hours(1);
        PostSnapshot {
            wordpress_post_id: remote_id,
            title: title.to_string(),
            content: "<p>one two three</p>".into(),
            excerpt: None,
            status: PostStatus::Published,
            wordpress_slug: Some(format!("post-{}", remote_id)),
            wordpress_link: Some(format!("https://garden.example.com/post-{}", remote_id)),
            word_count: 3,
            reading_time: 1,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_blog_round_trip_and_domain_lookup() {
        let (_tmp, store) = setup().await;
        let created = blog(&store).await;

        let found = store
            .find_blog_by_domain("GARDEN.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.is_active);
        assert_eq!(found.wp_credential_ref.as_deref(), Some("garden"));
    }

    #[tokio::test]
    async fn test_update_blog_persists_settings() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;

        let updated = store
            .update_blog(
                &b.id,
                &BlogUpdate {
                    name: Some("Garden Journal".into()),
                    wp_api_url: Some("https://wp.garden.example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.updated_at >= b.updated_at);

        let stored = store.get_blog(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Garden Journal");
        assert_eq!(stored.domain, "garden.example.com");
        assert_eq!(stored.wp_api_url.as_deref(), Some("https://wp.garden.example.com"));
        assert_eq!(stored.wp_credential_ref.as_deref(), Some("garden"));

        assert!(store
            .update_blog("missing", &BlogUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remote_id_unique_per_blog() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;

        store.insert_remote_post(&b.id, &snapshot(42, "First")).await.unwrap();
        let err = store.insert_remote_post(&b.id, &snapshot(42, "Again")).await;
        assert!(err.is_err());
        assert_eq!(store.list_posts(&b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_only_posts_do_not_collide() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        for title in ["a", "b"] {
            store
                .create_post(&NewPost {
                    blog_id: b.id.clone(),
                    title: title.into(),
                    slug: None,
                    content: String::new(),
                    excerpt: None,
                    status: PostStatus::Draft,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.list_posts(&b.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_title_rejected() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        let long = "x".repeat(501);
        assert!(store.insert_remote_post(&b.id, &snapshot(1, &long)).await.is_err());
    }

    #[tokio::test]
    async fn test_update_remote_post_stamps_synced_at() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        let post = store.insert_remote_post(&b.id, &snapshot(5, "Old")).await.unwrap();

        let updated = store
            .update_remote_post(&post.id, &snapshot(5, "New"))
            .await
            .unwrap();
        assert_eq!(updated.title, "New");
        assert!(updated.synced_at.unwrap() >= post.synced_at.unwrap());
        assert!(!updated.edited_since_sync());
    }

    #[tokio::test]
    async fn test_edit_marks_post_for_push() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        let post = store.insert_remote_post(&b.id, &snapshot(5, "Old")).await.unwrap();
        assert!(!post.needs_push());

        let edited = store
            .edit_post(
                &post.id,
                &PostEdit {
                    content: Some("<p>a b c d e</p>".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.word_count, 5);
        assert!(edited.needs_push());

        let stored = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.local_edited_at, edited.local_edited_at);
        assert!(stored.needs_push());
    }

    #[tokio::test]
    async fn test_future_remote_modified_time_is_not_a_local_edit() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        let mut future = snapshot(8, "Scheduled");
        future.status = PostStatus::Scheduled;
        future.updated_at = Utc::now() + Duration::days(365 * 70);

        let post = store.insert_remote_post(&b.id, &future).await.unwrap();
        let post = store.update_remote_post(&post.id, &future).await.unwrap();

        let stored = store.get_post(&post.id).await.unwrap().unwrap();
        assert!(stored.updated_at > stored.synced_at.unwrap());
        assert_eq!(stored.local_edited_at, None);
        assert!(!stored.edited_since_sync());
        assert!(!stored.needs_push());
    }

    #[tokio::test]
    async fn test_record_push_sets_remote_identity() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        let post = store
            .create_post(&NewPost {
                blog_id: b.id.clone(),
                title: "Local".into(),
                slug: None,
                content: "body".into(),
                excerpt: None,
                status: PostStatus::Draft,
            })
            .await
            .unwrap();

        store
            .record_push(
                &post.id,
                &RemoteLink {
                    wordpress_post_id: 900,
                    wordpress_slug: Some("local".into()),
                    wordpress_link: Some("https://garden.example.com/local".into()),
                },
            )
            .await
            .unwrap();

        let stored = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.wordpress_post_id, Some(900));
        assert!(!stored.needs_push());
    }

    #[tokio::test]
    async fn test_mark_deleted_keeps_other_fields() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        let post = store.insert_remote_post(&b.id, &snapshot(7, "Keep")).await.unwrap();

        assert!(store.mark_post_deleted(&b.id, 7).await.unwrap());
        assert!(!store.mark_post_deleted(&b.id, 8).await.unwrap());

        let stored = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostStatus::Deleted);
        assert_eq!(stored.title, "Keep");
        assert_eq!(stored.updated_at, post.updated_at);
    }

    #[tokio::test]
    async fn test_logs_newest_first_with_paging() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        for i in 0..3 {
            store
                .append_sync_log(&NewSyncLog {
                    blog_id: b.id.clone(),
                    sync_type: "manual".into(),
                    status: SyncLogStatus::Completed,
                    details: serde_json::json!({ "n": i }),
                })
                .await
                .unwrap();
        }

        let page = store.list_sync_logs(&b.id, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].details["n"], 2);
        let rest = store.list_sync_logs(&b.id, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].details["n"], 0);
    }

    #[tokio::test]
    async fn test_keywords_ordered_by_volume_with_variations() {
        let (_tmp, store) = setup().await;
        let b = blog(&store).await;
        for (kw, volume) in [("compost", 100), ("mulch", 900)] {
            store
                .create_keyword(&NewKeyword {
                    blog_id: b.id.clone(),
                    keyword: kw.into(),
                    metrics: KeywordMetrics {
                        search_volume: Some(volume),
                        ..Default::default()
                    },
                    variations: vec![NewVariation {
                        keyword: format!("best {}", kw),
                        metrics: KeywordMetrics::default(),
                    }],
                })
                .await
                .unwrap();
        }

        let keywords = store.list_keywords(&b.id).await.unwrap();
        assert_eq!(keywords[0].keyword, "mulch");
        assert_eq!(keywords[0].variations[0].keyword, "best mulch");

        let stats = store.blog_stats(&b.id).await.unwrap().unwrap();
        assert_eq!(stats.keywords_total, 2);
        assert_eq!(stats.variations_total, 2);
    }

    #[tokio::test]
    async fn test_stats_for_unknown_blog_is_none() {
        let (_tmp, store) = setup().await;
        assert!(store.blog_stats("missing").await.unwrap().is_none());
    }
}
