//! In-memory [`ContentStore`] implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Enforces the same uniqueness and
//! title-length rules as the SQLite schema so coordinator tests observe the
//! same failures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Blog, BlogFilter, BlogStats, BlogUpdate, ContentPost, KeywordVariation, MainKeyword,
    MediaAsset, MediaSnapshot, NewBlog, NewKeyword, NewPost, NewSyncLog, PostEdit, PostSnapshot,
    RemoteLink, SyncLogEntry,
};
use crate::status::PostStatus;
use crate::text::{reading_time, word_count};

use super::{check_title, ContentStore};

/// In-memory store for tests.
pub struct InMemoryStore {
    blogs: RwLock<Vec<Blog>>,
    posts: RwLock<Vec<ContentPost>>,
    media: RwLock<Vec<MediaAsset>>,
    logs: RwLock<Vec<SyncLogEntry>>,
    keywords: RwLock<Vec<MainKeyword>>,
    reject_push_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            blogs: RwLock::new(Vec::new()),
            posts: RwLock::new(Vec::new()),
            media: RwLock::new(Vec::new()),
            logs: RwLock::new(Vec::new()),
            keywords: RwLock::new(Vec::new()),
            reject_push_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent [`ContentStore::record_push`] calls fail.
    pub fn reject_push_writes(&self, reject: bool) {
        self.reject_push_writes.store(reject, Ordering::SeqCst);
    }

    /// Every stored post across all blogs.
    pub fn all_posts(&self) -> Vec<ContentPost> {
        self.posts.read().unwrap().clone()
    }

    /// Every stored log entry, in insertion order.
    pub fn all_logs(&self) -> Vec<SyncLogEntry> {
        self.logs.read().unwrap().clone()
    }

    pub fn all_media(&self) -> Vec<MediaAsset> {
        self.media.read().unwrap().clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_snapshot(post: &mut ContentPost, snapshot: &PostSnapshot) {
    post.title = snapshot.title.clone();
    post.content = snapshot.content.clone();
    post.excerpt = snapshot.excerpt.clone();
    post.status = snapshot.status;
    post.wordpress_post_id = Some(snapshot.wordpress_post_id);
    post.wordpress_slug = snapshot.wordpress_slug.clone();
    post.wordpress_link = snapshot.wordpress_link.clone();
    post.word_count = snapshot.word_count;
    post.reading_time = snapshot.reading_time;
    post.published_at = snapshot.published_at;
    post.created_at = snapshot.created_at;
    post.updated_at = snapshot.updated_at;
    post.synced_at = Some(Utc::now());
}

fn apply_media_snapshot(asset: &mut MediaAsset, snapshot: &MediaSnapshot) {
    asset.filename = snapshot.filename.clone();
    asset.url = snapshot.url.clone();
    asset.mime_type = snapshot.mime_type.clone();
    asset.alt_text = snapshot.alt_text.clone();
    asset.caption = snapshot.caption.clone();
    asset.size = snapshot.size;
    asset.wordpress_media_id = Some(snapshot.wordpress_media_id);
    asset.created_at = snapshot.created_at;
    asset.updated_at = snapshot.updated_at;
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn create_blog(&self, blog: &NewBlog) -> Result<Blog> {
        let mut blogs = self.blogs.write().unwrap();
        if blogs
            .iter()
            .any(|b| b.domain.eq_ignore_ascii_case(&blog.domain))
        {
            bail!("a blog with domain '{}' already exists", blog.domain);
        }
        let now = Utc::now();
        let created = Blog {
            id: Uuid::new_v4().to_string(),
            name: blog.name.clone(),
            domain: blog.domain.clone(),
            niche: blog.niche.clone(),
            description: blog.description.clone(),
            wp_api_url: blog.wp_api_url.clone(),
            wp_credential_ref: blog.wp_credential_ref.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        blogs.push(created.clone());
        Ok(created)
    }

    async fn get_blog(&self, id: &str) -> Result<Option<Blog>> {
        let blogs = self.blogs.read().unwrap();
        Ok(blogs.iter().find(|b| b.id == id).cloned())
    }

    async fn find_blog_by_domain(&self, domain: &str) -> Result<Option<Blog>> {
        let blogs = self.blogs.read().unwrap();
        Ok(blogs
            .iter()
            .find(|b| b.domain.eq_ignore_ascii_case(domain))
            .cloned())
    }

    async fn list_blogs(&self, filter: &BlogFilter) -> Result<Vec<Blog>> {
        let blogs = self.blogs.read().unwrap();
        let mut out: Vec<Blog> = blogs
            .iter()
            .filter(|b| !filter.active_only || b.is_active)
            .filter(|b| {
                filter
                    .domain
                    .as_deref()
                    .map_or(true, |d| b.domain.eq_ignore_ascii_case(d))
            })
            .cloned()
            .collect();
        out.reverse();
        Ok(out)
    }

    async fn update_blog(&self, id: &str, update: &BlogUpdate) -> Result<Option<Blog>> {
        let mut blogs = self.blogs.write().unwrap();
        let Some(blog) = blogs.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        update.apply_to(blog);
        blog.updated_at = Utc::now();
        Ok(Some(blog.clone()))
    }

    async fn set_blog_active(&self, id: &str, active: bool) -> Result<bool> {
        let mut blogs = self.blogs.write().unwrap();
        let Some(blog) = blogs.iter_mut().find(|b| b.id == id) else {
            return Ok(false);
        };
        blog.is_active = active;
        blog.updated_at = Utc::now();
        Ok(true)
    }

    async fn create_post(&self, post: &NewPost) -> Result<ContentPost> {
        check_title(&post.title)?;
        let now = Utc::now();
        let words = word_count(&post.content);
        let created = ContentPost {
            id: Uuid::new_v4().to_string(),
            blog_id: post.blog_id.clone(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            status: post.status,
            wordpress_post_id: None,
            wordpress_slug: None,
            wordpress_link: None,
            word_count: words,
            reading_time: reading_time(words),
            published_at: (post.status == PostStatus::Published).then_some(now),
            created_at: now,
            updated_at: now,
            synced_at: None,
            local_edited_at: None,
        };
        self.posts.write().unwrap().push(created.clone());
        Ok(created)
    }

    async fn get_post(&self, id: &str) -> Result<Option<ContentPost>> {
        let posts = self.posts.read().unwrap();
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn edit_post(&self, id: &str, edit: &PostEdit) -> Result<Option<ContentPost>> {
        if let Some(title) = &edit.title {
            check_title(title)?;
        }
        let mut posts = self.posts.write().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &edit.title {
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
        Ok(Some(post.clone()))
    }

    async fn list_posts(&self, blog_id: &str) -> Result<Vec<ContentPost>> {
        let posts = self.posts.read().unwrap();
        Ok(posts.iter().filter(|p| p.blog_id == blog_id).cloned().collect())
    }

    async fn find_post_by_remote_id(
        &self,
        blog_id: &str,
        wordpress_post_id: i64,
    ) -> Result<Option<ContentPost>> {
        let posts = self.posts.read().unwrap();
        Ok(posts
            .iter()
            .find(|p| p.blog_id == blog_id && p.wordpress_post_id == Some(wordpress_post_id))
            .cloned())
    }

    async fn insert_remote_post(
        &self,
        blog_id: &str,
        snapshot: &PostSnapshot,
    ) -> Result<ContentPost> {
        check_title(&snapshot.title)?;
        let mut posts = self.posts.write().unwrap();
        if posts.iter().any(|p| {
            p.blog_id == blog_id && p.wordpress_post_id == Some(snapshot.wordpress_post_id)
        }) {
            bail!(
                "UNIQUE constraint failed: blog {} already has remote post {}",
                blog_id,
                snapshot.wordpress_post_id
            );
        }
        let mut post = ContentPost {
            id: Uuid::new_v4().to_string(),
            blog_id: blog_id.to_string(),
            title: String::new(),
            slug: snapshot.wordpress_slug.clone(),
            content: String::new(),
            excerpt: None,
            status: snapshot.status,
            wordpress_post_id: None,
            wordpress_slug: None,
            wordpress_link: None,
            word_count: 0,
            reading_time: 0,
            published_at: None,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            synced_at: None,
            local_edited_at: None,
        };
        apply_snapshot(&mut post, snapshot);
        posts.push(post.clone());
        Ok(post)
    }

    async fn update_remote_post(
        &self,
        post_id: &str,
        snapshot: &PostSnapshot,
    ) -> Result<ContentPost> {
        check_title(&snapshot.title)?;
        let mut posts = self.posts.write().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
            bail!("post not found: {}", post_id);
        };
        apply_snapshot(post, snapshot);
        Ok(post.clone())
    }

    async fn record_push(&self, post_id: &str, link: &RemoteLink) -> Result<()> {
        if self.reject_push_writes.load(Ordering::SeqCst) {
            bail!("write rejected for post {}", post_id);
        }
        let mut posts = self.posts.write().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == post_id) else {
            bail!("post not found: {}", post_id);
        };
        let now = Utc::now();
        post.wordpress_post_id = Some(link.wordpress_post_id);
        post.wordpress_slug = link.wordpress_slug.clone();
        post.wordpress_link = link.wordpress_link.clone();
        post.updated_at = now;
        post.synced_at = Some(now);
        Ok(())
    }

    async fn mark_post_deleted(&self, blog_id: &str, wordpress_post_id: i64) -> Result<bool> {
        let mut posts = self.posts.write().unwrap();
        let mut matched = false;
        for post in posts
            .iter_mut()
            .filter(|p| p.blog_id == blog_id && p.wordpress_post_id == Some(wordpress_post_id))
        {
            post.status = PostStatus::Deleted;
            matched = true;
        }
        Ok(matched)
    }

    async fn find_media_by_remote_id(
        &self,
        blog_id: &str,
        wordpress_media_id: i64,
    ) -> Result<Option<MediaAsset>> {
        let media = self.media.read().unwrap();
        Ok(media
            .iter()
            .find(|m| m.blog_id == blog_id && m.wordpress_media_id == Some(wordpress_media_id))
            .cloned())
    }

    async fn insert_remote_media(
        &self,
        blog_id: &str,
        snapshot: &MediaSnapshot,
    ) -> Result<MediaAsset> {
        let mut media = self.media.write().unwrap();
        if media.iter().any(|m| {
            m.blog_id == blog_id && m.wordpress_media_id == Some(snapshot.wordpress_media_id)
        }) {
            bail!(
                "UNIQUE constraint failed: blog {} already has remote media {}",
                blog_id,
                snapshot.wordpress_media_id
            );
        }
        let mut asset = MediaAsset {
            id: Uuid::new_v4().to_string(),
            blog_id: blog_id.to_string(),
            filename: String::new(),
            url: String::new(),
            mime_type: String::new(),
            alt_text: None,
            caption: None,
            size: 0,
            wordpress_media_id: None,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        };
        apply_media_snapshot(&mut asset, snapshot);
        media.push(asset.clone());
        Ok(asset)
    }

    async fn update_remote_media(
        &self,
        media_id: &str,
        snapshot: &MediaSnapshot,
    ) -> Result<MediaAsset> {
        let mut media = self.media.write().unwrap();
        let Some(asset) = media.iter_mut().find(|m| m.id == media_id) else {
            bail!("media not found: {}", media_id);
        };
        apply_media_snapshot(asset, snapshot);
        Ok(asset.clone())
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
        self.logs.write().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_sync_logs(
        &self,
        blog_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SyncLogEntry>> {
        let logs = self.logs.read().unwrap();
        Ok(logs
            .iter()
            .rev()
            .filter(|l| l.blog_id == blog_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create_keyword(&self, keyword: &NewKeyword) -> Result<MainKeyword> {
        let main_id = Uuid::new_v4().to_string();
        let variations = keyword
            .variations
            .iter()
            .map(|v| KeywordVariation {
                id: Uuid::new_v4().to_string(),
                main_keyword_id: main_id.clone(),
                keyword: v.keyword.clone(),
                metrics: v.metrics.clone(),
                is_used: false,
            })
            .collect();
        let created = MainKeyword {
            id: main_id,
            blog_id: keyword.blog_id.clone(),
            keyword: keyword.keyword.clone(),
            metrics: keyword.metrics.clone(),
            is_used: false,
            created_at: Utc::now(),
            variations,
        };
        self.keywords.write().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_keywords(&self, blog_id: &str) -> Result<Vec<MainKeyword>> {
        let keywords = self.keywords.read().unwrap();
        let mut out: Vec<MainKeyword> = keywords
            .iter()
            .filter(|k| k.blog_id == blog_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.metrics.search_volume.cmp(&a.metrics.search_volume));
        Ok(out)
    }

    async fn blog_stats(&self, blog_id: &str) -> Result<Option<BlogStats>> {
        let Some(blog) = self.get_blog(blog_id).await? else {
            return Ok(None);
        };
        let posts = self.list_posts(blog_id).await?;
        let mut posts_by_status = BTreeMap::new();
        for post in &posts {
            *posts_by_status
                .entry(post.status.as_str().to_string())
                .or_insert(0) += 1;
        }
        let media_total = self
            .media
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.blog_id == blog_id)
            .count() as i64;
        let keywords = self.list_keywords(blog_id).await?;
        let last_sync = self.list_sync_logs(blog_id, 1, 0).await?.into_iter().next();

        Ok(Some(BlogStats {
            blog_id: blog.id,
            blog_name: blog.name,
            domain: blog.domain,
            posts_total: posts.len() as i64,
            posts_by_status,
            posts_linked: posts
                .iter()
                .filter(|p| p.wordpress_post_id.is_some())
                .count() as i64,
            media_total,
            keywords_total: keywords.len() as i64,
            keywords_used: keywords.iter().filter(|k| k.is_used).count() as i64,
            variations_total: keywords.iter().map(|k| k.variations.len() as i64).sum(),
            last_sync,
        }))
    }
}
