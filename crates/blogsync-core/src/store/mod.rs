//! Storage abstraction for the content database.
//!
//! The [`ContentStore`] trait is the only way the sync coordinator, webhook
//! receiver, and HTTP handlers touch persisted state. Implementations must
//! enforce the reconciliation-key invariant (one row per blog and remote id)
//! and the [`MAX_TITLE_LEN`](crate::models::MAX_TITLE_LEN) limit.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Blog, BlogFilter, BlogStats, BlogUpdate, ContentPost, MainKeyword, MediaAsset, MediaSnapshot,
    NewBlog, NewKeyword, NewPost, NewSyncLog, PostEdit, PostSnapshot, RemoteLink, SyncLogEntry,
};

/// Abstract content database.
///
/// # Operations
///
/// | Group | Methods |
/// |-------|---------|
/// | Blogs | [`create_blog`](ContentStore::create_blog), [`get_blog`](ContentStore::get_blog), [`find_blog_by_domain`](ContentStore::find_blog_by_domain), [`list_blogs`](ContentStore::list_blogs), [`update_blog`](ContentStore::update_blog), [`set_blog_active`](ContentStore::set_blog_active) |
/// | Posts | [`create_post`](ContentStore::create_post), [`edit_post`](ContentStore::edit_post), [`find_post_by_remote_id`](ContentStore::find_post_by_remote_id), [`insert_remote_post`](ContentStore::insert_remote_post), [`update_remote_post`](ContentStore::update_remote_post), [`record_push`](ContentStore::record_push), [`mark_post_deleted`](ContentStore::mark_post_deleted) |
/// | Media | [`find_media_by_remote_id`](ContentStore::find_media_by_remote_id), [`insert_remote_media`](ContentStore::insert_remote_media), [`update_remote_media`](ContentStore::update_remote_media) |
/// | Logs | [`append_sync_log`](ContentStore::append_sync_log), [`list_sync_logs`](ContentStore::list_sync_logs) |
/// | Keywords | [`create_keyword`](ContentStore::create_keyword), [`list_keywords`](ContentStore::list_keywords) |
/// | Stats | [`blog_stats`](ContentStore::blog_stats) |
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_blog(&self, blog: &NewBlog) -> Result<Blog>;

    async fn get_blog(&self, id: &str) -> Result<Option<Blog>>;

    /// Case-insensitive exact match on the blog's domain.
    async fn find_blog_by_domain(&self, domain: &str) -> Result<Option<Blog>>;

    /// Blogs matching `filter`, newest first.
    async fn list_blogs(&self, filter: &BlogFilter) -> Result<Vec<Blog>>;

    /// Apply a partial settings update. `None` when the blog does not exist.
    async fn update_blog(&self, id: &str, update: &BlogUpdate) -> Result<Option<Blog>>;

    /// Enable or disable syncing for a blog. Returns whether the blog exists.
    async fn set_blog_active(&self, id: &str, active: bool) -> Result<bool>;

    /// Insert a local-only post (no remote id).
    async fn create_post(&self, post: &NewPost) -> Result<ContentPost>;

    async fn get_post(&self, id: &str) -> Result<Option<ContentPost>>;

    /// Apply a local edit and bump `updated_at`. Returns `None` for an unknown id.
    async fn edit_post(&self, id: &str, edit: &PostEdit) -> Result<Option<ContentPost>>;

    /// All posts of a blog, oldest first.
    async fn list_posts(&self, blog_id: &str) -> Result<Vec<ContentPost>>;

    async fn find_post_by_remote_id(
        &self,
        blog_id: &str,
        wordpress_post_id: i64,
    ) -> Result<Option<ContentPost>>;

    /// Insert a post pulled from WordPress. Fails if the remote id is already
    /// present for this blog.
    async fn insert_remote_post(&self, blog_id: &str, snapshot: &PostSnapshot)
        -> Result<ContentPost>;

    /// Overwrite the mutable fields of an existing post with pulled data and
    /// stamp `synced_at`.
    async fn update_remote_post(&self, post_id: &str, snapshot: &PostSnapshot)
        -> Result<ContentPost>;

    /// Write back the identity WordPress assigned after a push and stamp
    /// both `updated_at` and `synced_at`.
    async fn record_push(&self, post_id: &str, link: &RemoteLink) -> Result<()>;

    /// Soft-delete: set the status to `deleted` and touch nothing else.
    /// Returns whether a matching row existed.
    async fn mark_post_deleted(&self, blog_id: &str, wordpress_post_id: i64) -> Result<bool>;

    async fn find_media_by_remote_id(
        &self,
        blog_id: &str,
        wordpress_media_id: i64,
    ) -> Result<Option<MediaAsset>>;

    async fn insert_remote_media(&self, blog_id: &str, snapshot: &MediaSnapshot)
        -> Result<MediaAsset>;

    async fn update_remote_media(&self, media_id: &str, snapshot: &MediaSnapshot)
        -> Result<MediaAsset>;

    async fn append_sync_log(&self, entry: &NewSyncLog) -> Result<SyncLogEntry>;

    /// Log entries for a blog, newest first.
    async fn list_sync_logs(
        &self,
        blog_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SyncLogEntry>>;

    async fn create_keyword(&self, keyword: &NewKeyword) -> Result<MainKeyword>;

    /// Main keywords of a blog with their variations, highest search volume first.
    async fn list_keywords(&self, blog_id: &str) -> Result<Vec<MainKeyword>>;

    /// Aggregate counts for a blog, or `None` if the blog does not exist.
    async fn blog_stats(&self, blog_id: &str) -> Result<Option<BlogStats>>;
}

/// Reject titles the schema would refuse.
pub fn check_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if len > crate::models::MAX_TITLE_LEN {
        anyhow::bail!(
            "title is {} characters long; at most {} are allowed",
            len,
            crate::models::MAX_TITLE_LEN
        );
    }
    Ok(())
}
