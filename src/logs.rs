//! `blogsync logs`: print a blog's sync history, newest first.

use anyhow::{bail, Result};

use blogsync_core::models::SyncLogEntry;
use blogsync_core::store::ContentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_logs(config: &Config, blog_id: &str, limit: i64, offset: i64) -> Result<()> {
    if !(1..=200).contains(&limit) {
        bail!("--limit must be between 1 and 200");
    }
    if offset < 0 {
        bail!("--offset must not be negative");
    }

    let store = SqliteStore::open(config).await?;
    if store.get_blog(blog_id).await?.is_none() {
        bail!("blog not found: {}", blog_id);
    }

    let logs = store.list_sync_logs(blog_id, limit, offset).await?;
    if logs.is_empty() {
        println!("No sync log entries.");
    } else {
        println!("{:<20} {:<26} {:<10} SUMMARY", "WHEN", "TYPE", "STATUS");
        for entry in &logs {
            println!(
                "{:<20} {:<26} {:<10} {}",
                entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                entry.sync_type,
                entry.status,
                summarize(entry)
            );
        }
    }

    store.pool().close().await;
    Ok(())
}

/// One-line digest of a log entry's details.
fn summarize(entry: &SyncLogEntry) -> String {
    let details = &entry.details;
    if let Some(error) = details.get("error").and_then(|v| v.as_str()) {
        return error.to_string();
    }
    if let Some(posts) = details.get("posts_synced").and_then(|v| v.as_u64()) {
        let media = details
            .get("media_synced")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let errors = details.get("errors").and_then(|v| v.as_u64()).unwrap_or(0);
        return format!("{} posts, {} media, {} errors", posts, media, errors);
    }
    if let Some(action) = details.get("action").and_then(|v| v.as_str()) {
        let post = details
            .get("post_id")
            .map(|v| v.to_string())
            .unwrap_or_default();
        return format!("{} {}", action, post).trim_end().to_string();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogsync_core::models::SyncLogStatus;
    use chrono::Utc;
    use serde_json::json;

    fn entry(details: serde_json::Value) -> SyncLogEntry {
        SyncLogEntry {
            id: "l1".into(),
            blog_id: "b1".into(),
            sync_type: "wp_to_supabase".into(),
            status: SyncLogStatus::Completed,
            details,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_report() {
        let e = entry(json!({ "posts_synced": 3, "media_synced": 1, "errors": 0 }));
        assert_eq!(summarize(&e), "3 posts, 1 media, 0 errors");
    }

    #[test]
    fn test_summarize_failure_and_webhook() {
        assert_eq!(summarize(&entry(json!({ "error": "boom" }))), "boom");
        assert_eq!(
            summarize(&entry(json!({ "action": "post_deleted", "post_id": 7 }))),
            "post_deleted 7"
        );
        assert_eq!(summarize(&entry(json!({}))), "");
    }
}
