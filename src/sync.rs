//! Sync coordinator: reconciles a blog's posts and media with WordPress.
//!
//! # Pull (`wp_to_supabase`)
//!
//! 1. Page through the remote listing (or fetch the single scoped post).
//! 2. Match each remote post to a local row by `(blog_id, wordpress_post_id)`.
//! 3. Update the match, or insert a new row. Word count and reading time are
//!    recomputed from the rendered body.
//! 4. A failing item is recorded as an `error` outcome and the pass moves on.
//! 5. For unscoped pulls, media runs through the same matching afterwards.
//!    A media listing failure lands in `media_error` and does not fail the pass.
//!
//! # Push (`supabase_to_wp`)
//!
//! Local posts that were never pushed or were edited since their last
//! confirmed sync are created or updated remotely, then the identity
//! WordPress assigned is written back. If that write-back fails after a
//! remote create, the remote post is left in place and the outcome carries
//! its id.
//!
//! Every pass that resolves its blog appends exactly one sync log entry.
//! A successful pass fires the `blog-sync` workflow once; trigger failures
//! are logged and swallowed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use blogsync_core::models::{
    Blog, ContentPost, MediaSnapshot, NewSyncLog, PostSnapshot, RemoteLink, SyncLogStatus,
};
use blogsync_core::status::PostStatus;
use blogsync_core::store::ContentStore;
use blogsync_core::text::{reading_time, word_count};

use crate::config::{Config, WordPressConfig};
use crate::error::{SyncError, SyncResult};
use crate::wordpress::{
    MediaFilter, PlatformConnector, PostFields, PostFilter, PublishingPlatform, RemoteMedia,
    RemotePost, WordPressConnector,
};
use crate::workflow::{self, blog_sync_payload, WorkflowTrigger, BLOG_SYNC_EVENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    /// WordPress → local store.
    #[serde(rename = "wp_to_supabase", alias = "pull")]
    Pull,
    /// Local store → WordPress.
    #[serde(rename = "supabase_to_wp", alias = "push")]
    Push,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "wp_to_supabase",
            SyncDirection::Push => "supabase_to_wp",
        }
    }
}

impl Default for SyncDirection {
    fn default() -> Self {
        SyncDirection::Pull
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" | "wp_to_supabase" => Ok(SyncDirection::Pull),
            "push" | "supabase_to_wp" => Ok(SyncDirection::Push),
            other => Err(format!(
                "unknown direction '{}': expected pull, push, wp_to_supabase, or supabase_to_wp",
                other
            )),
        }
    }
}

/// Which items a pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    All,
    /// One local post by its local id.
    LocalPost(String),
    /// One post by its WordPress id.
    RemotePost(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Created,
    Updated,
    Skipped,
    Error,
}

/// Result of reconciling one post or media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    /// Local id, when a local row exists.
    pub id: Option<String>,
    pub remote_id: Option<i64>,
    pub title: Option<String>,
    pub action: ItemAction,
    /// The local row had unsynced edits that this pull overwrote.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub diverged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemOutcome {
    fn new(action: ItemAction, id: Option<String>, remote_id: Option<i64>) -> Self {
        Self {
            id,
            remote_id,
            title: None,
            action,
            diverged: false,
            message: None,
        }
    }

    fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.action == ItemAction::Error
    }

    fn is_synced(&self) -> bool {
        matches!(self.action, ItemAction::Created | ItemAction::Updated)
    }
}

/// Summary of one pass. Also stored as the sync log entry's details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub posts_synced: usize,
    pub media_synced: usize,
    pub errors: usize,
    pub posts: Vec<ItemOutcome>,
    pub media: Vec<ItemOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_error: Option<String>,
}

impl SyncReport {
    fn new(direction: SyncDirection, posts: Vec<ItemOutcome>, media: Vec<ItemOutcome>) -> Self {
        Self {
            direction,
            posts_synced: posts.iter().filter(|o| o.is_synced()).count(),
            media_synced: media.iter().filter(|o| o.is_synced()).count(),
            errors: posts.iter().chain(media.iter()).filter(|o| o.is_error()).count(),
            posts,
            media,
            media_error: None,
        }
    }
}

/// Listing parameters for pulls.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub per_page: u32,
    pub max_pages: u32,
    pub post_statuses: String,
    pub media_type: Option<String>,
}

impl From<&WordPressConfig> for SyncSettings {
    fn from(config: &WordPressConfig) -> Self {
        Self {
            per_page: config.per_page,
            max_pages: config.max_pages,
            post_statuses: config.post_statuses.clone(),
            media_type: Some(config.media_type.clone()).filter(|t| !t.is_empty()),
        }
    }
}

/// Project a remote post into the fields a pull writes.
pub fn snapshot_from_remote(remote: &RemotePost) -> PostSnapshot {
    let status = match remote.remote_status() {
        Some(status) => status.to_local(),
        None => {
            tracing::warn!(
                remote_id = remote.id,
                status = %remote.status,
                "unknown remote status; storing as draft"
            );
            PostStatus::Draft
        }
    };
    let words = word_count(&remote.content.rendered);
    let created_at = remote.created_at().unwrap_or_else(Utc::now);
    let published_at = matches!(status, PostStatus::Published | PostStatus::Scheduled)
        .then_some(created_at);

    PostSnapshot {
        wordpress_post_id: remote.id,
        title: remote.title.rendered.clone(),
        content: remote.content.rendered.clone(),
        excerpt: Some(remote.excerpt.rendered.clone()).filter(|e| !e.is_empty()),
        status,
        wordpress_slug: remote.slug.clone(),
        wordpress_link: remote.link.clone(),
        word_count: words,
        reading_time: reading_time(words),
        published_at,
        created_at,
        updated_at: remote.modified_at().unwrap_or(created_at),
    }
}

fn snapshot_from_media(remote: &RemoteMedia) -> MediaSnapshot {
    let created_at = remote.created_at().unwrap_or_else(Utc::now);
    MediaSnapshot {
        wordpress_media_id: remote.id,
        filename: remote.filename(),
        url: remote.source_url.clone(),
        mime_type: remote.mime_type.clone(),
        alt_text: remote.alt_text.clone().filter(|a| !a.is_empty()),
        caption: Some(remote.caption.rendered.clone()).filter(|c| !c.is_empty()),
        size: remote.size(),
        created_at,
        updated_at: remote.modified_at().unwrap_or(created_at),
    }
}

fn post_fields(post: &ContentPost) -> PostFields {
    PostFields {
        title: post.title.clone(),
        content: post.content.clone(),
        excerpt: post.excerpt.clone().unwrap_or_default(),
        status: post.status.to_remote(),
        slug: post.slug.clone(),
    }
}

fn remote_link(remote: &RemotePost) -> RemoteLink {
    RemoteLink {
        wordpress_post_id: remote.id,
        wordpress_slug: remote.slug.clone(),
        wordpress_link: remote.link.clone(),
    }
}

pub struct SyncCoordinator {
    store: Arc<dyn ContentStore>,
    connector: Arc<dyn PlatformConnector>,
    workflow: Arc<dyn WorkflowTrigger>,
    settings: SyncSettings,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        connector: Arc<dyn PlatformConnector>,
        workflow: Arc<dyn WorkflowTrigger>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            connector,
            workflow,
            settings,
        }
    }

    /// Wire up the WordPress connector and workflow trigger from `config`.
    pub fn from_config(config: &Config, store: Arc<dyn ContentStore>) -> SyncResult<Self> {
        Ok(Self::new(
            store,
            Arc::new(WordPressConnector::from_config(config)),
            Arc::from(workflow::from_config(&config.workflow)?),
            SyncSettings::from(&config.wordpress),
        ))
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn connector(&self) -> &Arc<dyn PlatformConnector> {
        &self.connector
    }

    /// Run one pass for `blog_id`.
    ///
    /// Unknown blogs fail with [`SyncError::NotFound`] and write nothing.
    /// Every other failure to run the pass is recorded as a `failed` log
    /// entry before it is returned.
    pub async fn synchronize(
        &self,
        blog_id: &str,
        direction: SyncDirection,
        scope: SyncScope,
    ) -> SyncResult<SyncReport> {
        let blog = self
            .store
            .get_blog(blog_id)
            .await?
            .ok_or_else(|| SyncError::not_found(format!("blog not found: {}", blog_id)))?;

        tracing::info!(blog = %blog.domain, %direction, ?scope, "sync started");

        let result = self.run_pass(&blog, direction, &scope).await;

        match result {
            Ok(report) => {
                self.append_log(
                    &blog.id,
                    direction.as_str(),
                    SyncLogStatus::Completed,
                    serde_json::to_value(&report).unwrap_or_else(|_| json!({})),
                )
                .await;
                tracing::info!(
                    blog = %blog.domain,
                    %direction,
                    posts = report.posts_synced,
                    media = report.media_synced,
                    errors = report.errors,
                    "sync completed"
                );
                self.notify_workflow(&blog).await;
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(blog = %blog.domain, %direction, error = %err, "sync failed");
                self.append_log(
                    &blog.id,
                    direction.as_str(),
                    SyncLogStatus::Failed,
                    json!({
                        "direction": direction,
                        "error": err.to_string(),
                        "kind": err.kind(),
                    }),
                )
                .await;
                Err(err)
            }
        }
    }

    async fn run_pass(
        &self,
        blog: &Blog,
        direction: SyncDirection,
        scope: &SyncScope,
    ) -> SyncResult<SyncReport> {
        let platform = self.open(blog)?;
        match direction {
            SyncDirection::Pull => self.pull(blog, platform.as_ref(), scope).await,
            SyncDirection::Push => self.push(blog, platform.as_ref(), scope).await,
        }
    }

    /// Check the blog may be synced and resolve its platform handle.
    pub fn open(&self, blog: &Blog) -> SyncResult<Arc<dyn PublishingPlatform>> {
        if !blog.is_active {
            return Err(SyncError::configuration(format!(
                "blog {} is inactive",
                blog.domain
            )));
        }
        self.connector.connect(blog)
    }

    async fn pull(
        &self,
        blog: &Blog,
        platform: &dyn PublishingPlatform,
        scope: &SyncScope,
    ) -> SyncResult<SyncReport> {
        let remote_posts = match scope {
            SyncScope::All => self.list_all_posts(platform).await?,
            SyncScope::RemotePost(remote_id) => vec![platform.get_post(*remote_id).await?],
            SyncScope::LocalPost(id) => {
                let post = self.local_post(blog, id).await?;
                let remote_id = post.wordpress_post_id.ok_or_else(|| {
                    SyncError::invalid_field("postId", "post has not been pushed to WordPress")
                })?;
                vec![platform.get_post(remote_id).await?]
            }
        };

        let mut posts = Vec::with_capacity(remote_posts.len());
        for remote in &remote_posts {
            posts.push(self.upsert_remote_post(&blog.id, remote).await);
        }

        let mut media = Vec::new();
        let mut media_error = None;
        if *scope == SyncScope::All {
            match self.list_all_media(platform).await {
                Ok(items) => {
                    for remote in &items {
                        media.push(self.upsert_remote_media(&blog.id, remote).await);
                    }
                }
                Err(err) => {
                    tracing::warn!(blog = %blog.domain, error = %err, "media listing failed");
                    media_error = Some(err.to_string());
                }
            }
        }

        let mut report = SyncReport::new(SyncDirection::Pull, posts, media);
        report.media_error = media_error;
        Ok(report)
    }

    async fn list_all_posts(&self, platform: &dyn PublishingPlatform) -> SyncResult<Vec<RemotePost>> {
        let mut all = Vec::new();
        for page in 1..=self.settings.max_pages {
            let batch = platform
                .list_posts(&PostFilter {
                    page,
                    per_page: self.settings.per_page,
                    status: Some(self.settings.post_statuses.clone()),
                })
                .await?;
            let last = (batch.len() as u32) < self.settings.per_page;
            all.extend(batch);
            if last {
                break;
            }
        }
        Ok(all)
    }

    async fn list_all_media(&self, platform: &dyn PublishingPlatform) -> SyncResult<Vec<RemoteMedia>> {
        let mut all = Vec::new();
        for page in 1..=self.settings.max_pages {
            let batch = platform
                .list_media(&MediaFilter {
                    page,
                    per_page: self.settings.per_page,
                    media_type: self.settings.media_type.clone(),
                })
                .await?;
            let last = (batch.len() as u32) < self.settings.per_page;
            all.extend(batch);
            if last {
                break;
            }
        }
        Ok(all)
    }

    async fn local_post(&self, blog: &Blog, id: &str) -> SyncResult<ContentPost> {
        self.store
            .get_post(id)
            .await?
            .filter(|p| p.blog_id == blog.id)
            .ok_or_else(|| SyncError::not_found(format!("post not found: {}", id)))
    }

    /// Create-or-update one pulled post by its remote id. Never fails: store
    /// errors come back as an `error` outcome.
    pub async fn upsert_remote_post(&self, blog_id: &str, remote: &RemotePost) -> ItemOutcome {
        let snapshot = snapshot_from_remote(remote);
        let title = snapshot.title.clone();

        let existing = match self.store.find_post_by_remote_id(blog_id, remote.id).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(remote_id = remote.id, error = %e, "post lookup failed");
                return ItemOutcome::new(ItemAction::Error, None, Some(remote.id))
                    .titled(&title)
                    .with_message(format!("{:#}", e));
            }
        };

        match existing {
            Some(local) => {
                let diverged = local.edited_since_sync();
                if diverged {
                    tracing::warn!(
                        post = %local.id,
                        remote_id = remote.id,
                        "local edits since last sync are overwritten by WordPress"
                    );
                }
                match self.store.update_remote_post(&local.id, &snapshot).await {
                    Ok(post) => {
                        tracing::debug!(post = %post.id, remote_id = remote.id, "post updated");
                        let mut outcome =
                            ItemOutcome::new(ItemAction::Updated, Some(post.id), Some(remote.id))
                                .titled(&title);
                        outcome.diverged = diverged;
                        outcome
                    }
                    Err(e) => {
                        tracing::warn!(remote_id = remote.id, error = %e, "post update failed");
                        ItemOutcome::new(ItemAction::Error, Some(local.id), Some(remote.id))
                            .titled(&title)
                            .with_message(format!("{:#}", e))
                    }
                }
            }
            None => match self.store.insert_remote_post(blog_id, &snapshot).await {
                Ok(post) => {
                    tracing::debug!(post = %post.id, remote_id = remote.id, "post created");
                    ItemOutcome::new(ItemAction::Created, Some(post.id), Some(remote.id))
                        .titled(&title)
                }
                Err(e) => {
                    tracing::warn!(remote_id = remote.id, error = %e, "post insert failed");
                    ItemOutcome::new(ItemAction::Error, None, Some(remote.id))
                        .titled(&title)
                        .with_message(format!("{:#}", e))
                }
            },
        }
    }

    async fn upsert_remote_media(&self, blog_id: &str, remote: &RemoteMedia) -> ItemOutcome {
        let snapshot = snapshot_from_media(remote);
        let title = snapshot.filename.clone();

        let written = match self.store.find_media_by_remote_id(blog_id, remote.id).await {
            Ok(Some(local)) => self
                .store
                .update_remote_media(&local.id, &snapshot)
                .await
                .map(|m| (ItemAction::Updated, m.id)),
            Ok(None) => self
                .store
                .insert_remote_media(blog_id, &snapshot)
                .await
                .map(|m| (ItemAction::Created, m.id)),
            Err(e) => Err(e),
        };

        match written {
            Ok((action, id)) => ItemOutcome::new(action, Some(id), Some(remote.id)).titled(&title),
            Err(e) => {
                tracing::warn!(media_id = remote.id, error = %e, "media write failed");
                ItemOutcome::new(ItemAction::Error, None, Some(remote.id))
                    .titled(&title)
                    .with_message(format!("{:#}", e))
            }
        }
    }

    async fn push(
        &self,
        blog: &Blog,
        platform: &dyn PublishingPlatform,
        scope: &SyncScope,
    ) -> SyncResult<SyncReport> {
        let candidates: Vec<ContentPost> = match scope {
            SyncScope::All => self
                .store
                .list_posts(&blog.id)
                .await?
                .into_iter()
                .filter(ContentPost::needs_push)
                .collect(),
            SyncScope::LocalPost(id) => vec![self.local_post(blog, id).await?],
            SyncScope::RemotePost(remote_id) => vec![self
                .store
                .find_post_by_remote_id(&blog.id, *remote_id)
                .await?
                .ok_or_else(|| {
                    SyncError::not_found(format!("no local post for remote post {}", remote_id))
                })?],
        };

        let mut posts = Vec::with_capacity(candidates.len());
        for post in &candidates {
            posts.push(self.push_post(platform, post).await);
        }
        Ok(SyncReport::new(SyncDirection::Push, posts, Vec::new()))
    }

    async fn push_post(&self, platform: &dyn PublishingPlatform, post: &ContentPost) -> ItemOutcome {
        if post.status == PostStatus::Deleted {
            return ItemOutcome::new(ItemAction::Skipped, Some(post.id.clone()), post.wordpress_post_id)
                .titled(&post.title)
                .with_message("post is deleted");
        }

        let fields = post_fields(post);
        let (action, remote) = match post.wordpress_post_id {
            Some(remote_id) => (
                ItemAction::Updated,
                platform.update_post(remote_id, &fields).await,
            ),
            None => (ItemAction::Created, platform.create_post(&fields).await),
        };

        let remote = match remote {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(post = %post.id, error = %e, "remote write failed");
                return ItemOutcome::new(ItemAction::Error, Some(post.id.clone()), post.wordpress_post_id)
                    .titled(&post.title)
                    .with_message(e.to_string());
            }
        };

        match self.store.record_push(&post.id, &remote_link(&remote)).await {
            Ok(()) => {
                tracing::debug!(post = %post.id, remote_id = remote.id, ?action, "post pushed");
                ItemOutcome::new(action, Some(post.id.clone()), Some(remote.id)).titled(&post.title)
            }
            Err(e) => {
                tracing::error!(
                    post = %post.id,
                    remote_id = remote.id,
                    error = %e,
                    "remote post written but local write-back failed; remote post left in place"
                );
                ItemOutcome::new(ItemAction::Error, Some(post.id.clone()), Some(remote.id))
                    .titled(&post.title)
                    .with_message(format!(
                        "remote post {} written but local record not updated: {:#}",
                        remote.id, e
                    ))
            }
        }
    }

    /// Append a log entry. A failed append is logged, never returned.
    pub async fn append_log(
        &self,
        blog_id: &str,
        sync_type: &str,
        status: SyncLogStatus,
        details: serde_json::Value,
    ) {
        let entry = NewSyncLog {
            blog_id: blog_id.to_string(),
            sync_type: sync_type.to_string(),
            status,
            details,
        };
        if let Err(e) = self.store.append_sync_log(&entry).await {
            tracing::warn!(blog_id, sync_type, error = %e, "failed to append sync log");
        }
    }

    /// Fire the `blog-sync` workflow, logging and swallowing failures.
    pub async fn notify_workflow(&self, blog: &Blog) {
        let payload = blog_sync_payload(blog);
        if let Err(e) = self.workflow.trigger(BLOG_SYNC_EVENT, &payload).await {
            tracing::warn!(blog = %blog.domain, error = %e, "workflow trigger failed");
        }
    }
}
