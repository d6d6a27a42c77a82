//! Inbound change notifications from WordPress.
//!
//! A delivery names one post, the site it came from, and what happened to
//! it. Published and updated posts are fetched and upserted exactly like a
//! single-item pull; deleted posts are soft-deleted locally. Every delivery
//! that resolves to a blog appends one `webhook_wp_to_supabase` log entry.

use anyhow::anyhow;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;

use blogsync_core::models::{Blog, SyncLogStatus};

use crate::error::{FieldError, SyncError, SyncResult};
use crate::sync::SyncCoordinator;

pub const WEBHOOK_SYNC_TYPE: &str = "webhook_wp_to_supabase";

/// Header carrying `sha256=<hex hmac of the raw body>`.
pub const SIGNATURE_HEADER: &str = "x-blogsync-signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    PostPublished,
    PostUpdated,
    PostDeleted,
}

impl WebhookAction {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "post_published" => Some(WebhookAction::PostPublished),
            "post_updated" => Some(WebhookAction::PostUpdated),
            "post_deleted" => Some(WebhookAction::PostDeleted),
            _ => None,
        }
    }
}

/// Body as delivered, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWebhookPayload {
    #[serde(default)]
    pub post_id: Option<Value>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub post_id: i64,
    pub site_url: String,
    pub action: WebhookAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

impl WebhookAck {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Accept a number or a numeric string.
fn parse_post_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

impl RawWebhookPayload {
    /// `Ok(None)` for deliveries about anything other than posts.
    pub fn validate(&self) -> SyncResult<Option<WebhookEvent>> {
        let mut fields = Vec::new();

        // Pages and attachments are routine deliveries and are acknowledged.
        // A payload with no post_type at all is malformed.
        match self.post_type.as_deref() {
            Some("post") => {}
            Some(_) => return Ok(None),
            None => fields.push(FieldError::new("post_type", "is required")),
        }

        let post_id = match &self.post_id {
            Some(value) => parse_post_id(value).or_else(|| {
                fields.push(FieldError::new("post_id", "must be a positive integer"));
                None
            }),
            None => {
                fields.push(FieldError::new("post_id", "is required"));
                None
            }
        };

        let site_url = match self.site_url.as_deref().map(str::trim) {
            Some(url) if !site_domain(url).is_empty() => Some(url.to_string()),
            Some(_) => {
                fields.push(FieldError::new("site_url", "must be a site URL"));
                None
            }
            None => {
                fields.push(FieldError::new("site_url", "is required"));
                None
            }
        };

        let action = match self.action.as_deref() {
            Some(raw) => WebhookAction::parse(raw).or_else(|| {
                fields.push(FieldError::new(
                    "action",
                    format!(
                        "unknown action '{}': expected post_published, post_updated, or post_deleted",
                        raw
                    ),
                ));
                None
            }),
            None => {
                fields.push(FieldError::new("action", "is required"));
                None
            }
        };

        match (post_id, site_url, action) {
            (Some(post_id), Some(site_url), Some(action)) if fields.is_empty() => {
                Ok(Some(WebhookEvent {
                    post_id,
                    site_url,
                    action,
                }))
            }
            _ => Err(SyncError::validation("invalid webhook payload", fields)),
        }
    }
}

/// Reduce a site URL to the bare lowercase host used as a blog's domain.
///
/// `https://www.Example.com:8443/blog/` → `example.com`
pub fn site_domain(site_url: &str) -> String {
    let without_scheme = site_url
        .trim()
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(site_url.trim());
    let authority = without_scheme
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port.split(':').next().unwrap_or_default();
    let host = host.to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Check `sha256=<hex>` against an HMAC-SHA256 of `body` keyed by `secret`.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> SyncResult<()> {
    let header =
        header.ok_or_else(|| SyncError::Unauthorized("missing webhook signature".to_string()))?;
    let hex_sig = header.trim().strip_prefix("sha256=").unwrap_or(header.trim());
    let expected = hex::decode(hex_sig)
        .map_err(|_| SyncError::Unauthorized("malformed webhook signature".to_string()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SyncError::configuration(format!("webhook secret: {}", e)))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| SyncError::Unauthorized("webhook signature mismatch".to_string()))
}

/// Hex HMAC-SHA256 signature header value for `body`.
pub fn sign(secret: &str, body: &[u8]) -> SyncResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SyncError::configuration(format!("webhook secret: {}", e)))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Apply one delivery.
///
/// Non-post deliveries are acknowledged without side effects. Unknown sites
/// are [`SyncError::NotFound`] with no writes. Once the blog is known, any
/// failure is recorded as a `failed` log entry before being returned.
pub async fn handle_webhook(
    coordinator: &SyncCoordinator,
    payload: &RawWebhookPayload,
) -> SyncResult<WebhookAck> {
    let Some(event) = payload.validate()? else {
        tracing::debug!(post_type = ?payload.post_type, "ignoring non-post webhook");
        return Ok(WebhookAck::ok("ignored: not a post"));
    };

    let domain = site_domain(&event.site_url);
    let blog = coordinator
        .store()
        .find_blog_by_domain(&domain)
        .await?
        .ok_or_else(|| SyncError::not_found(format!("no blog registered for {}", domain)))?;

    tracing::info!(blog = %blog.domain, post_id = event.post_id, action = ?event.action, "webhook received");

    match apply(coordinator, &blog, &event).await {
        Ok((ack, details)) => {
            coordinator
                .append_log(&blog.id, WEBHOOK_SYNC_TYPE, SyncLogStatus::Completed, details)
                .await;
            if event.action != WebhookAction::PostDeleted {
                coordinator.notify_workflow(&blog).await;
            }
            Ok(ack)
        }
        Err(err) => {
            tracing::warn!(blog = %blog.domain, post_id = event.post_id, error = %err, "webhook failed");
            coordinator
                .append_log(
                    &blog.id,
                    WEBHOOK_SYNC_TYPE,
                    SyncLogStatus::Failed,
                    json!({
                        "action": event.action,
                        "post_id": event.post_id,
                        "error": err.to_string(),
                        "kind": err.kind(),
                    }),
                )
                .await;
            Err(err)
        }
    }
}

async fn apply(
    coordinator: &SyncCoordinator,
    blog: &Blog,
    event: &WebhookEvent,
) -> SyncResult<(WebhookAck, Value)> {
    match event.action {
        WebhookAction::PostDeleted => {
            let matched = coordinator
                .store()
                .mark_post_deleted(&blog.id, event.post_id)
                .await?;
            if !matched {
                tracing::info!(post_id = event.post_id, "delete for unknown remote post");
            }
            Ok((
                WebhookAck::ok(format!("post {} marked deleted", event.post_id)),
                json!({
                    "action": event.action,
                    "post_id": event.post_id,
                    "matched": matched,
                }),
            ))
        }
        WebhookAction::PostPublished | WebhookAction::PostUpdated => {
            let platform = coordinator.open(blog)?;
            let remote = platform.get_post(event.post_id).await?;
            let outcome = coordinator.upsert_remote_post(&blog.id, &remote).await;
            if outcome.is_error() {
                return Err(SyncError::Store(anyhow!(
                    "post {}: {}",
                    event.post_id,
                    outcome.message.clone().unwrap_or_default()
                )));
            }
            Ok((
                WebhookAck::ok(format!("post {} synced", event.post_id)),
                json!({
                    "action": event.action,
                    "post_id": event.post_id,
                    "outcome": outcome,
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{harness, remote_post};
    use crate::sync::ItemAction;
    use blogsync_core::status::PostStatus;
    use blogsync_core::store::ContentStore;

    fn payload(post_id: Value, post_type: &str, action: &str) -> RawWebhookPayload {
        RawWebhookPayload {
            post_id: Some(post_id),
            post_type: Some(post_type.into()),
            site_url: Some("https://www.garden.example.com/".into()),
            action: Some(action.into()),
        }
    }

    #[test]
    fn test_site_domain() {
        assert_eq!(site_domain("https://www.Example.com:8443/blog/"), "example.com");
        assert_eq!(site_domain("garden.example.com"), "garden.example.com");
        assert_eq!(site_domain("http://user@host.test/x?y"), "host.test");
        assert_eq!(site_domain("https://"), "");
    }

    #[test]
    fn test_post_id_number_or_string() {
        assert_eq!(parse_post_id(&json!(42)), Some(42));
        assert_eq!(parse_post_id(&json!(" 42 ")), Some(42));
        assert_eq!(parse_post_id(&json!("abc")), None);
        assert_eq!(parse_post_id(&json!(-1)), None);
    }

    #[test]
    fn test_validation_reports_fields() {
        let raw = RawWebhookPayload {
            post_type: Some("post".into()),
            action: Some("post_archived".into()),
            ..Default::default()
        };
        match raw.validate() {
            Err(SyncError::Validation { fields, .. }) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["post_id", "site_url", "action"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_post_type_is_invalid_but_other_types_are_skipped() {
        let mut raw = payload(json!(3), "attachment", "post_updated");
        assert!(matches!(raw.validate(), Ok(None)));

        raw.post_type = None;
        match raw.validate() {
            Err(SyncError::Validation { fields, .. }) => {
                assert_eq!(fields[0].field, "post_type");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"post_id":1}"#;
        let header = sign("s3cret", body).unwrap();
        verify_signature("s3cret", body, Some(&header)).unwrap();
        assert!(verify_signature("other", body, Some(&header)).is_err());
        assert!(verify_signature("s3cret", body, None).is_err());
        assert!(verify_signature("s3cret", body, Some("sha256=zz")).is_err());
    }

    #[tokio::test]
    async fn test_non_post_is_acknowledged_without_writes() {
        let h = harness().await;
        let ack = handle_webhook(&h.coordinator, &payload(json!(1), "page", "post_updated"))
            .await
            .unwrap();
        assert!(ack.success);
        assert!(h.store.all_logs().is_empty());
        assert!(h.store.all_posts().is_empty());
        assert!(h.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_published_creates_post() {
        let h = harness().await;
        h.platform.add_post(remote_post(9, "Spring beds", "publish"));

        handle_webhook(&h.coordinator, &payload(json!("9"), "post", "post_published"))
            .await
            .unwrap();

        let posts = h.store.all_posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].status, PostStatus::Published);
        let logs = h.store.all_logs();
        assert_eq!(logs[0].sync_type, WEBHOOK_SYNC_TYPE);
        assert_eq!(logs[0].status, SyncLogStatus::Completed);
        assert_eq!(logs[0].details["outcome"]["action"], "created");
        assert_eq!(h.trigger.count(), 1);

        h.platform.posts.lock().unwrap()[0].title.rendered = "Summer beds".into();
        handle_webhook(&h.coordinator, &payload(json!(9), "post", "post_updated"))
            .await
            .unwrap();
        let posts = h.store.all_posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Summer beds");
        assert_eq!(
            h.store.all_logs()[1].details["outcome"]["action"],
            serde_json::to_value(ItemAction::Updated).unwrap()
        );
    }

    #[tokio::test]
    async fn test_deleted_soft_deletes() {
        let h = harness().await;
        h.platform.add_post(remote_post(9, "Keep me", "publish"));
        handle_webhook(&h.coordinator, &payload(json!(9), "post", "post_published"))
            .await
            .unwrap();
        let before = h.store.all_posts()[0].clone();

        handle_webhook(&h.coordinator, &payload(json!(9), "post", "post_deleted"))
            .await
            .unwrap();

        let after = h.store.all_posts();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].status, PostStatus::Deleted);
        assert_eq!(
            ContentPostFields::from(&after[0]),
            ContentPostFields::from(&before)
        );
        assert_eq!(h.store.all_logs()[1].details["matched"], true);
        assert_eq!(h.trigger.count(), 1);
    }

    /// Everything but the status.
    #[derive(Debug, PartialEq)]
    struct ContentPostFields {
        title: String,
        content: String,
        wordpress_post_id: Option<i64>,
        updated_at: chrono::DateTime<chrono::Utc>,
        synced_at: Option<chrono::DateTime<chrono::Utc>>,
        local_edited_at: Option<chrono::DateTime<chrono::Utc>>,
    }

    impl From<&blogsync_core::models::ContentPost> for ContentPostFields {
        fn from(p: &blogsync_core::models::ContentPost) -> Self {
            Self {
                title: p.title.clone(),
                content: p.content.clone(),
                wordpress_post_id: p.wordpress_post_id,
                updated_at: p.updated_at,
                synced_at: p.synced_at,
                local_edited_at: p.local_edited_at,
            }
        }
    }

    #[tokio::test]
    async fn test_delete_of_unknown_post_is_logged_unmatched() {
        let h = harness().await;
        handle_webhook(&h.coordinator, &payload(json!(404), "post", "post_deleted"))
            .await
            .unwrap();
        let logs = h.store.all_logs();
        assert_eq!(logs[0].status, SyncLogStatus::Completed);
        assert_eq!(logs[0].details["matched"], false);
    }

    #[tokio::test]
    async fn test_unknown_site_is_not_found_without_writes() {
        let h = harness().await;
        let mut raw = payload(json!(1), "post", "post_updated");
        raw.site_url = Some("https://elsewhere.example.org".into());
        let err = handle_webhook(&h.coordinator, &raw).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert!(h.store.all_logs().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_failed_log() {
        let h = harness().await;
        let err = handle_webhook(&h.coordinator, &payload(json!(77), "post", "post_updated"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::RemoteUnavailable {
                status: Some(404),
                ..
            }
        ));
        let logs = h.store.all_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SyncLogStatus::Failed);
        assert_eq!(h.trigger.count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected_without_writes() {
        let h = harness().await;
        let err = handle_webhook(&h.coordinator, &payload(json!(1), "post", "post_archived"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation { .. }));
        assert!(h.store.all_logs().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_failed_log() {
        let h = harness().await;
        h.platform.add_post(remote_post(3, &"y".repeat(700), "publish"));
        let err = handle_webhook(&h.coordinator, &payload(json!(3), "post", "post_published"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(h.store.all_logs()[0].status, SyncLogStatus::Failed);
        assert!(h.store.find_post_by_remote_id(&h.blog.id, 3).await.unwrap().is_none());
    }
}
