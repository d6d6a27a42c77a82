//! In-process stand-ins for WordPress and the workflow engine, shared by
//! the coordinator, webhook, and router tests.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use blogsync_core::models::{Blog, NewBlog};
use blogsync_core::status::RemoteStatus;
use blogsync_core::store::memory::InMemoryStore;
use blogsync_core::store::ContentStore;

use crate::config::WordPressConfig;
use crate::error::{SyncError, SyncResult};
use crate::sync::{SyncCoordinator, SyncSettings};
use crate::wordpress::{
    MediaFilter, PlatformConnector, PostFields, PostFilter, PublishingPlatform, RemoteMedia,
    RemotePost, Rendered,
};
use crate::workflow::WorkflowTrigger;

pub fn remote_post(id: i64, title: &str, status: &str) -> RemotePost {
    RemotePost {
        id,
        date: Some("2024-03-01T09:00:00".into()),
        date_gmt: Some("2024-03-01T08:00:00".into()),
        modified: None,
        modified_gmt: Some("2024-03-02T08:00:00".into()),
        slug: Some(format!("post-{}", id)),
        status: status.to_string(),
        link: Some(format!("https://garden.example.com/post-{}/", id)),
        title: Rendered {
            rendered: title.to_string(),
        },
        content: Rendered {
            rendered: "<p>seed the beds in spring</p>".into(),
        },
        excerpt: Rendered::default(),
    }
}

pub fn remote_media(id: i64, file: &str) -> RemoteMedia {
    RemoteMedia {
        id,
        date: None,
        date_gmt: Some("2024-03-01T08:00:00".into()),
        modified: None,
        modified_gmt: None,
        slug: None,
        source_url: format!("https://garden.example.com/uploads/{}", file),
        mime_type: "image/jpeg".into(),
        alt_text: Some(String::new()),
        title: Rendered::default(),
        caption: Rendered::default(),
        media_details: None,
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub posts: Mutex<Vec<RemotePost>>,
    pub media: Mutex<Vec<RemoteMedia>>,
    calls: Mutex<Vec<String>>,
    pub fail_listing: AtomicBool,
    pub fail_media_listing: AtomicBool,
    pub fail_writes: AtomicBool,
    next_id: AtomicI64,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        let platform = Self::default();
        platform.next_id.store(1000, Ordering::SeqCst);
        Arc::new(platform)
    }

    pub fn add_post(&self, post: RemotePost) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn add_media(&self, media: RemoteMedia) {
        self.media.lock().unwrap().push(media);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(what: &str, id: i64) -> SyncError {
        SyncError::remote(
            format!("GET /{}/{}", what, id),
            Some(404),
            r#"{"code":"rest_post_invalid_id"}"#,
        )
    }

    fn apply_fields(post: &mut RemotePost, fields: &PostFields) {
        post.title.rendered = fields.title.clone();
        post.content.rendered = fields.content.clone();
        post.excerpt.rendered = fields.excerpt.clone();
        post.status = fields.status.as_str().to_string();
        if let Some(slug) = &fields.slug {
            post.slug = Some(slug.clone());
        }
    }
}

fn page<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
    let start = ((page.max(1) - 1) * per_page) as usize;
    items
        .iter()
        .skip(start)
        .take(per_page as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl PublishingPlatform for FakePlatform {
    async fn list_posts(&self, filter: &PostFilter) -> SyncResult<Vec<RemotePost>> {
        self.record(format!("list_posts:{}", filter.page));
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(SyncError::remote("GET /posts", Some(503), "maintenance"));
        }
        Ok(page(&self.posts.lock().unwrap(), filter.page, filter.per_page))
    }

    async fn get_post(&self, remote_id: i64) -> SyncResult<RemotePost> {
        self.record(format!("get_post:{}", remote_id));
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == remote_id)
            .cloned()
            .ok_or_else(|| Self::not_found("posts", remote_id))
    }

    async fn create_post(&self, fields: &PostFields) -> SyncResult<RemotePost> {
        self.record("create_post".to_string());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::remote("POST /posts", Some(500), "db error"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut post = remote_post(id, &fields.title, RemoteStatus::Draft.as_str());
        Self::apply_fields(&mut post, fields);
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, remote_id: i64, fields: &PostFields) -> SyncResult<RemotePost> {
        self.record(format!("update_post:{}", remote_id));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::remote("POST /posts", Some(500), "db error"));
        }
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == remote_id)
            .ok_or_else(|| Self::not_found("posts", remote_id))?;
        Self::apply_fields(post, fields);
        Ok(post.clone())
    }

    async fn delete_post(&self, remote_id: i64, _force: bool) -> SyncResult<()> {
        self.record(format!("delete_post:{}", remote_id));
        self.posts.lock().unwrap().retain(|p| p.id != remote_id);
        Ok(())
    }

    async fn list_media(&self, filter: &MediaFilter) -> SyncResult<Vec<RemoteMedia>> {
        self.record(format!("list_media:{}", filter.page));
        if self.fail_media_listing.load(Ordering::SeqCst) {
            return Err(SyncError::remote("GET /media", Some(502), "bad gateway"));
        }
        Ok(page(&self.media.lock().unwrap(), filter.page, filter.per_page))
    }

    async fn get_media(&self, remote_id: i64) -> SyncResult<RemoteMedia> {
        self.record(format!("get_media:{}", remote_id));
        self.media
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == remote_id)
            .cloned()
            .ok_or_else(|| Self::not_found("media", remote_id))
    }
}

/// Hands out the same [`FakePlatform`] for every blog that has a URL.
pub struct FakeConnector {
    pub platform: Arc<FakePlatform>,
}

impl PlatformConnector for FakeConnector {
    fn connect(&self, blog: &Blog) -> SyncResult<Arc<dyn PublishingPlatform>> {
        if blog.wp_api_url.is_none() {
            return Err(SyncError::configuration(format!(
                "blog {} has no WordPress URL",
                blog.domain
            )));
        }
        Ok(self.platform.clone())
    }
}

#[derive(Default)]
pub struct RecordingTrigger {
    pub events: Mutex<Vec<(String, Value)>>,
    pub fail: AtomicBool,
}

impl RecordingTrigger {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkflowTrigger for RecordingTrigger {
    async fn trigger(&self, event: &str, payload: &Value) -> SyncResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::remote("POST /blog-sync", Some(500), "engine down"));
        }
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub platform: Arc<FakePlatform>,
    pub trigger: Arc<RecordingTrigger>,
    pub coordinator: Arc<SyncCoordinator>,
    pub blog: Blog,
}

/// A coordinator over an in-memory store with one registered blog.
pub async fn harness() -> Harness {
    harness_with(WordPressConfig::default()).await
}

pub async fn harness_with(wordpress: WordPressConfig) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let platform = FakePlatform::new();
    let trigger = Arc::new(RecordingTrigger::default());
    let blog = store
        .create_blog(&NewBlog {
            name: "Garden Notes".into(),
            domain: "garden.example.com".into(),
            wp_api_url: Some("https://garden.example.com".into()),
            wp_credential_ref: Some("garden".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let coordinator = Arc::new(SyncCoordinator::new(
        store.clone(),
        Arc::new(FakeConnector {
            platform: platform.clone(),
        }),
        trigger.clone(),
        SyncSettings::from(&wordpress),
    ));
    Harness {
        store,
        platform,
        trigger,
        coordinator,
        blog,
    }
}
