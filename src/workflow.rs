//! Workflow-automation trigger client.
//!
//! After a sync pass the coordinator notifies an external automation engine
//! (n8n-style webhook endpoints) so it can run derived processing. Triggers
//! are fire-and-forget from the caller's point of view: errors come back as
//! [`SyncError`] so they can be logged, and callers never propagate them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use blogsync_core::models::Blog;

use crate::config::WorkflowConfig;
use crate::error::{SyncError, SyncResult};

/// Event fired once per sync invocation.
pub const BLOG_SYNC_EVENT: &str = "blog-sync";

#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    async fn trigger(&self, event: &str, payload: &Value) -> SyncResult<()>;
}

/// Payload for [`BLOG_SYNC_EVENT`].
pub fn blog_sync_payload(blog: &Blog) -> Value {
    json!({
        "blogId": blog.id,
        "blogDomain": blog.domain,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Used when no `[workflow] base_url` is configured.
pub struct DisabledWorkflowTrigger;

#[async_trait]
impl WorkflowTrigger for DisabledWorkflowTrigger {
    async fn trigger(&self, event: &str, _payload: &Value) -> SyncResult<()> {
        tracing::debug!(event, "workflow triggers disabled; skipping");
        Ok(())
    }
}

pub struct HttpWorkflowTrigger {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    blog_sync_path: String,
}

impl HttpWorkflowTrigger {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        blog_sync_path: &str,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            blog_sync_path: blog_sync_path.trim_matches('/').to_string(),
        })
    }

    fn url_for(&self, event: &str) -> String {
        let path = if event == BLOG_SYNC_EVENT {
            self.blog_sync_path.as_str()
        } else {
            event.trim_matches('/')
        };
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl WorkflowTrigger for HttpWorkflowTrigger {
    async fn trigger(&self, event: &str, payload: &Value) -> SyncResult<()> {
        let url = self.url_for(event);
        let endpoint = format!("POST {}", url);

        let mut request = self.http.post(&url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.header("X-N8N-API-KEY", key);
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
        tracing::debug!(event, %url, "workflow triggered");
        Ok(())
    }
}

/// Build the trigger described by `[workflow]`.
pub fn from_config(config: &WorkflowConfig) -> SyncResult<Box<dyn WorkflowTrigger>> {
    match &config.base_url {
        Some(base_url) => Ok(Box::new(HttpWorkflowTrigger::new(
            base_url,
            config.resolve_api_key(),
            &config.blog_sync_path,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Box::new(DisabledWorkflowTrigger)),
    }
}
