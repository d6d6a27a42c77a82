//! WordPress REST client.
//!
//! [`PublishingPlatform`] is the seam the sync coordinator and webhook
//! receiver talk through; [`WordPressClient`] implements it against
//! `/wp-json/wp/v2` with Basic auth (WordPress application passwords).
//! [`PlatformConnector`] turns a [`Blog`] into a ready platform handle, so
//! credentials are resolved exactly once per sync pass or webhook delivery.
//!
//! Every non-2xx response and every transport failure becomes
//! [`SyncError::RemoteUnavailable`] carrying the upstream status and body.
//! Nothing here retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use blogsync_core::models::Blog;
use blogsync_core::status::RemoteStatus;

use crate::config::{Config, CredentialConfig};
use crate::error::{SyncError, SyncResult};

/// Resolved connection settings for one blog.
#[derive(Clone)]
pub struct WordPressConnection {
    /// REST base, e.g. `https://example.com/wp-json/wp/v2`.
    pub api_base: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for WordPressConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPressConnection")
            .field("api_base", &self.api_base)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl WordPressConnection {
    pub fn new(site_url: &str, username: &str, password: &str) -> Self {
        Self {
            api_base: api_base_for(site_url),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn authorization(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

/// Derive the `wp/v2` REST base from a site URL.
///
/// `https://example.com/` → `https://example.com/wp-json/wp/v2`. URLs that
/// already point into `/wp-json` are respected.
pub fn api_base_for(site_url: &str) -> String {
    let trimmed = site_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/wp-json") {
        format!("{}/wp/v2", trimmed)
    } else if trimmed.contains("/wp-json/") {
        trimmed.to_string()
    } else {
        format!("{}/wp-json/wp/v2", trimmed)
    }
}

/// `{ "rendered": "..." }` wrapper WordPress uses for title, content, excerpt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePost {
    pub id: i64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub modified_gmt: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
}

impl RemotePost {
    /// `None` for statuses outside the mapping table (`auto-draft`, `inherit`, ...).
    pub fn remote_status(&self) -> Option<RemoteStatus> {
        self.status.parse().ok()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_wp_date(self.date_gmt.as_deref(), self.date.as_deref())
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        parse_wp_date(self.modified_gmt.as_deref(), self.modified.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    #[serde(default)]
    pub filesize: Option<i64>,
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMedia {
    pub id: i64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub modified_gmt: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub caption: Rendered,
    #[serde(default)]
    pub media_details: Option<MediaDetails>,
}

impl RemoteMedia {
    /// Last path segment of the source URL, falling back to the slug.
    pub fn filename(&self) -> String {
        self.source_url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.slug.clone())
            .unwrap_or_else(|| format!("media-{}", self.id))
    }

    pub fn size(&self) -> i64 {
        self.media_details
            .as_ref()
            .and_then(|d| d.filesize)
            .unwrap_or(0)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_wp_date(self.date_gmt.as_deref(), self.date.as_deref())
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        parse_wp_date(self.modified_gmt.as_deref(), self.modified.as_deref())
    }
}

/// WordPress emits site-local `date` and naive-UTC `date_gmt`. Prefer the GMT
/// field; accept RFC 3339 too.
fn parse_wp_date(gmt: Option<&str>, local: Option<&str>) -> Option<DateTime<Utc>> {
    let parse = |s: &str| -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    };
    gmt.and_then(parse).or_else(|| local.and_then(parse))
}

#[derive(Debug, Clone)]
pub struct PostFilter {
    pub page: u32,
    pub per_page: u32,
    /// Comma-separated remote statuses.
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MediaFilter {
    pub page: u32,
    pub per_page: u32,
    pub media_type: Option<String>,
}

/// Body sent when creating or updating a remote post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub status: RemoteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[async_trait]
pub trait PublishingPlatform: Send + Sync {
    async fn list_posts(&self, filter: &PostFilter) -> SyncResult<Vec<RemotePost>>;

    async fn get_post(&self, remote_id: i64) -> SyncResult<RemotePost>;

    async fn create_post(&self, fields: &PostFields) -> SyncResult<RemotePost>;

    async fn update_post(&self, remote_id: i64, fields: &PostFields) -> SyncResult<RemotePost>;

    /// Move to trash, or delete permanently when `force` is set.
    async fn delete_post(&self, remote_id: i64, force: bool) -> SyncResult<()>;

    async fn list_media(&self, filter: &MediaFilter) -> SyncResult<Vec<RemoteMedia>>;

    async fn get_media(&self, remote_id: i64) -> SyncResult<RemoteMedia>;
}

/// reqwest-backed [`PublishingPlatform`].
pub struct WordPressClient {
    http: reqwest::Client,
    conn: WordPressConnection,
}

impl WordPressClient {
    pub fn new(conn: WordPressConnection, timeout: Duration) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("blogsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, conn })
    }

    pub fn connection(&self) -> &WordPressConnection {
        &self.conn
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&PostFields>,
    ) -> SyncResult<T> {
        let url = format!("{}{}", self.conn.api_base, path);
        let endpoint = format!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", self.conn.authorization())
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::remote(&endpoint, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::remote(endpoint, Some(status.as_u16()), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::remote(endpoint, Some(status.as_u16()), format!("invalid JSON: {}", e)))
    }
}

/// WordPress answers 400 `rest_post_invalid_page_number` past the last page.
fn is_past_last_page(err: &SyncError, page: u32) -> bool {
    match err {
        SyncError::RemoteUnavailable {
            status: Some(400),
            body,
            ..
        } => page > 1 && body.contains("rest_post_invalid_page_number"),
        _ => false,
    }
}

#[async_trait]
impl PublishingPlatform for WordPressClient {
    async fn list_posts(&self, filter: &PostFilter) -> SyncResult<Vec<RemotePost>> {
        let mut query = vec![
            ("page", filter.page.to_string()),
            ("per_page", filter.per_page.to_string()),
            ("context", "edit".to_string()),
        ];
        if let Some(status) = &filter.status {
            query.push(("status", status.clone()));
        }
        match self.send(Method::GET, "/posts", &query, None).await {
            Err(e) if is_past_last_page(&e, filter.page) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn get_post(&self, remote_id: i64) -> SyncResult<RemotePost> {
        self.send(
            Method::GET,
            &format!("/posts/{}", remote_id),
            &[("context", "edit".to_string())],
            None,
        )
        .await
    }

    async fn create_post(&self, fields: &PostFields) -> SyncResult<RemotePost> {
        self.send(Method::POST, "/posts", &[], Some(fields)).await
    }

    async fn update_post(&self, remote_id: i64, fields: &PostFields) -> SyncResult<RemotePost> {
        self.send(
            Method::POST,
            &format!("/posts/{}", remote_id),
            &[],
            Some(fields),
        )
        .await
    }

    async fn delete_post(&self, remote_id: i64, force: bool) -> SyncResult<()> {
        let _: serde_json::Value = self
            .send(
                Method::DELETE,
                &format!("/posts/{}", remote_id),
                &[("force", force.to_string())],
                None,
            )
            .await?;
        Ok(())
    }

    async fn list_media(&self, filter: &MediaFilter) -> SyncResult<Vec<RemoteMedia>> {
        let mut query = vec![
            ("page", filter.page.to_string()),
            ("per_page", filter.per_page.to_string()),
        ];
        if let Some(media_type) = &filter.media_type {
            query.push(("media_type", media_type.clone()));
        }
        match self.send(Method::GET, "/media", &query, None).await {
            Err(e) if is_past_last_page(&e, filter.page) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn get_media(&self, remote_id: i64) -> SyncResult<RemoteMedia> {
        self.send(Method::GET, &format!("/media/{}", remote_id), &[], None)
            .await
    }
}

/// Resolves a blog's connection settings into a platform handle.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, blog: &Blog) -> SyncResult<Arc<dyn PublishingPlatform>>;
}

/// Builds [`WordPressClient`]s from `[credentials]` entries.
pub struct WordPressConnector {
    credentials: BTreeMap<String, CredentialConfig>,
    timeout: Duration,
}

impl WordPressConnector {
    pub fn from_config(config: &Config) -> Self {
        Self {
            credentials: config.credentials.clone(),
            timeout: Duration::from_secs(config.wordpress.timeout_secs),
        }
    }

    /// Resolve `blog` into connection settings without building a client.
    pub fn resolve(&self, blog: &Blog) -> SyncResult<WordPressConnection> {
        let site_url = blog
            .wp_api_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                SyncError::configuration(format!("blog {} has no WordPress URL", blog.domain))
            })?;
        if !site_url.starts_with("http://") && !site_url.starts_with("https://") {
            return Err(SyncError::configuration(format!(
                "blog {} has an invalid WordPress URL '{}'",
                blog.domain, site_url
            )));
        }

        let cred_ref = blog
            .wp_credential_ref
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                SyncError::configuration(format!(
                    "blog {} has no WordPress credential reference",
                    blog.domain
                ))
            })?;
        let cred = self.credentials.get(cred_ref).ok_or_else(|| {
            SyncError::configuration(format!(
                "credential '{}' referenced by blog {} is not configured",
                cred_ref, blog.domain
            ))
        })?;
        let password = cred
            .resolve_password()
            .map_err(|e| SyncError::configuration(format!("credential '{}': {:#}", cred_ref, e)))?;

        Ok(WordPressConnection::new(site_url, &cred.username, &password))
    }
}

impl PlatformConnector for WordPressConnector {
    fn connect(&self, blog: &Blog) -> SyncResult<Arc<dyn PublishingPlatform>> {
        let conn = self.resolve(blog)?;
        Ok(Arc::new(WordPressClient::new(conn, self.timeout)?))
    }
}
