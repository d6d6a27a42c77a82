//! Core data models.
//!
//! Every entity belongs to exactly one [`Blog`]. Posts and media mirror
//! remote WordPress records through a nullable remote identifier, which is
//! the reconciliation key: at most one local row exists per
//! `(blog_id, wordpress_post_id)` and per `(blog_id, wordpress_media_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::status::PostStatus;

/// Longest post title either store accepts.
pub const MAX_TITLE_LEN: usize = 500;

/// A managed blog and its WordPress connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub niche: Option<String>,
    pub description: Option<String>,
    /// WordPress site URL (e.g. `https://example.com`).
    pub wp_api_url: Option<String>,
    /// Name of a `[credentials.<name>]` entry in the configuration.
    pub wp_credential_ref: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering a blog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBlog {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub wp_api_url: Option<String>,
    #[serde(default)]
    pub wp_credential_ref: Option<String>,
}

/// Partial update of a blog's editable settings. `None` leaves a field as is.
///
/// The domain is the webhook match key and cannot be changed here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub wp_api_url: Option<String>,
    #[serde(default)]
    pub wp_credential_ref: Option<String>,
}

impl BlogUpdate {
    /// Apply the present fields to `blog`.
    pub fn apply_to(&self, blog: &mut Blog) {
        if let Some(name) = &self.name {
            blog.name = name.clone();
        }
        if let Some(niche) = &self.niche {
            blog.niche = Some(niche.clone());
        }
        if let Some(description) = &self.description {
            blog.description = Some(description.clone());
        }
        if let Some(url) = &self.wp_api_url {
            blog.wp_api_url = Some(url.clone());
        }
        if let Some(credential) = &self.wp_credential_ref {
            blog.wp_credential_ref = Some(credential.clone());
        }
    }
}

/// Filters for listing blogs.
#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    pub active_only: bool,
    pub domain: Option<String>,
}

/// A post stored in the content database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPost {
    pub id: String,
    pub blog_id: String,
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
    pub wordpress_post_id: Option<i64>,
    pub wordpress_slug: Option<String>,
    pub wordpress_link: Option<String>,
    pub word_count: i64,
    pub reading_time: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When this row was last reconciled with WordPress.
    pub synced_at: Option<DateTime<Utc>>,
    /// Last local edit, on the local clock. `updated_at` may carry WordPress's
    /// clock, so only this field is compared against `synced_at`.
    #[serde(default)]
    pub local_edited_at: Option<DateTime<Utc>>,
}

impl ContentPost {
    /// True when the post was edited locally after its last reconciliation.
    pub fn edited_since_sync(&self) -> bool {
        match (self.local_edited_at, self.synced_at) {
            (Some(edited), Some(synced)) => edited > synced,
            _ => false,
        }
    }

    /// Whether an unscoped push should send this post to WordPress.
    ///
    /// Posts never pushed and posts edited since their last confirmed sync
    /// qualify; deleted posts never do.
    pub fn needs_push(&self) -> bool {
        if self.status == PostStatus::Deleted {
            return false;
        }
        self.wordpress_post_id.is_none() || self.edited_since_sync()
    }
}

/// Fields for creating a local-only post.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub blog_id: String,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default = "default_new_post_status")]
    pub status: PostStatus,
}

fn default_new_post_status() -> PostStatus {
    PostStatus::Draft
}

/// A partial local edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
}

/// Local projection of a remote post, ready to be written by a pull.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSnapshot {
    pub wordpress_post_id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
    pub wordpress_slug: Option<String>,
    pub wordpress_link: Option<String>,
    pub word_count: i64,
    pub reading_time: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity WordPress assigned to a pushed post.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteLink {
    pub wordpress_post_id: i64,
    pub wordpress_slug: Option<String>,
    pub wordpress_link: Option<String>,
}

/// A media file belonging to a blog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: String,
    pub blog_id: String,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub size: i64,
    pub wordpress_media_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Local projection of a remote media item.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSnapshot {
    pub wordpress_media_id: i64,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome recorded on a sync log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncLogStatus {
    Completed,
    Failed,
    Pending,
}

impl SyncLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLogStatus::Completed => "completed",
            SyncLogStatus::Failed => "failed",
            SyncLogStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for SyncLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncLogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SyncLogStatus::Completed),
            "failed" => Ok(SyncLogStatus::Failed),
            "pending" => Ok(SyncLogStatus::Pending),
            other => Err(format!(
                "invalid sync log status '{}': expected completed, failed, or pending",
                other
            )),
        }
    }
}

/// Append-only audit record of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: String,
    pub blog_id: String,
    pub sync_type: String,
    pub status: SyncLogStatus,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncLog {
    pub blog_id: String,
    pub sync_type: String,
    pub status: SyncLogStatus,
    pub details: serde_json::Value,
}

/// SEO metrics shared by main keywords and their variations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordMetrics {
    #[serde(default)]
    pub search_volume: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub cpc: Option<f64>,
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub search_intent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainKeyword {
    pub id: String,
    pub blog_id: String,
    pub keyword: String,
    #[serde(flatten)]
    pub metrics: KeywordMetrics,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub variations: Vec<KeywordVariation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordVariation {
    pub id: String,
    pub main_keyword_id: String,
    pub keyword: String,
    #[serde(flatten)]
    pub metrics: KeywordMetrics,
    pub is_used: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVariation {
    pub keyword: String,
    #[serde(flatten)]
    pub metrics: KeywordMetrics,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewKeyword {
    pub blog_id: String,
    pub keyword: String,
    #[serde(flatten)]
    pub metrics: KeywordMetrics,
    #[serde(default)]
    pub variations: Vec<NewVariation>,
}

/// Aggregate counts for one blog, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogStats {
    pub blog_id: String,
    pub blog_name: String,
    pub domain: String,
    pub posts_total: i64,
    pub posts_by_status: BTreeMap<String, i64>,
    pub posts_linked: i64,
    pub media_total: i64,
    pub keywords_total: i64,
    pub keywords_used: i64,
    pub variations_total: i64,
    pub last_sync: Option<SyncLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(remote: Option<i64>, status: PostStatus) -> ContentPost {
        let now = Utc::now();
        ContentPost {
            id: "p1".into(),
            blog_id: "b1".into(),
            title: "Hello".into(),
            slug: None,
            content: String::new(),
            excerpt: None,
            status,
            wordpress_post_id: remote,
            wordpress_slug: None,
            wordpress_link: None,
            word_count: 0,
            reading_time: 0,
            published_at: None,
            created_at: now,
            updated_at: now,
            synced_at: remote.map(|_| now),
            local_edited_at: None,
        }
    }

    #[test]
    fn test_local_only_post_needs_push() {
        assert!(post(None, PostStatus::Draft).needs_push());
    }

    #[test]
    fn test_synced_post_does_not_need_push() {
        assert!(!post(Some(7), PostStatus::Published).needs_push());
    }

    #[test]
    fn test_edited_post_needs_push() {
        let mut p = post(Some(7), PostStatus::Published);
        p.local_edited_at = Some(p.synced_at.unwrap() + Duration::seconds(5));
        assert!(p.edited_since_sync());
        assert!(p.needs_push());
    }

    #[test]
    fn test_remote_timestamp_ahead_of_sync_is_not_an_edit() {
        let mut p = post(Some(7), PostStatus::Scheduled);
        p.updated_at = p.synced_at.unwrap() + Duration::days(365 * 50);
        assert!(!p.edited_since_sync());
        assert!(!p.needs_push());
    }

    #[test]
    fn test_deleted_post_never_needs_push() {
        assert!(!post(None, PostStatus::Deleted).needs_push());
    }

    #[test]
    fn test_sync_log_status_parse() {
        assert_eq!("failed".parse::<SyncLogStatus>().unwrap(), SyncLogStatus::Failed);
        assert!("done".parse::<SyncLogStatus>().is_err());
    }
}
