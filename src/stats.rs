//! Dashboard statistics from the command line.
//!
//! Prints the same per-blog counts the `/api/dashboard/stats` endpoint
//! returns: posts by status, how many are linked to WordPress, media,
//! keyword coverage, and when the last sync ran.

use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use blogsync_core::models::{BlogFilter, BlogStats};
use blogsync_core::store::ContentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Run the stats command for one blog, or for every registered blog.
pub async fn run_stats(config: &Config, blog_id: Option<&str>) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    let stats: Vec<BlogStats> = match blog_id {
        Some(id) => vec![store
            .blog_stats(id)
            .await?
            .ok_or_else(|| anyhow!("blog not found: {}", id))?],
        None => {
            let mut all = Vec::new();
            for blog in store.list_blogs(&BlogFilter::default()).await? {
                if let Some(s) = store.blog_stats(&blog.id).await? {
                    all.push(s);
                }
            }
            all
        }
    };

    let db_size = file_size(&config.db.path);

    println!("blogsync stats");
    println!("==============");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));

    if stats.is_empty() {
        println!();
        println!("  No blogs registered.");
    }

    let now = Utc::now();
    for s in &stats {
        println!();
        println!("  {} ({})", s.blog_name, s.domain);
        println!("    Posts:       {} ({} linked)", s.posts_total, s.posts_linked);
        for (status, count) in &s.posts_by_status {
            println!("      {:<12} {}", status, count);
        }
        println!("    Media:       {}", s.media_total);
        println!(
            "    Keywords:    {} ({} used, {} variations)",
            s.keywords_total, s.keywords_used, s.variations_total
        );
        let last = match &s.last_sync {
            Some(entry) => format!(
                "{} {} ({})",
                entry.sync_type,
                entry.status,
                format_relative(entry.created_at, now)
            ),
            None => "never".to_string(),
        };
        println!("    Last sync:   {}", last);
    }
    println!();

    store.pool().close().await;
    Ok(())
}

/// Size of the database file, or 0 when it cannot be read.
fn file_size(path: &Path) -> u64 {
    match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot stat database file");
            0
        }
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Relative time such as "3 hours ago"; absolute past 30 days or in the future.
fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - at).num_seconds();
    if delta < 0 {
        return at.format("%Y-%m-%d %H:%M").to_string();
    }

    let plural = |n: i64| if n == 1 { "" } else { "s" };
    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, plural(mins))
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, plural(hours))
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, plural(days))
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_file_size_falls_back_to_zero() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("blogsync.sqlite");
        assert_eq!(file_size(&path), 0);

        std::fs::write(&path, [0u8; 300]).unwrap();
        assert_eq!(file_size(&path), 300);
    }

    #[test]
    fn test_format_relative() {
        let now = Utc::now();
        assert_eq!(format_relative(now, now), "just now");
        assert_eq!(format_relative(now - Duration::minutes(1), now), "1 min ago");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::days(2), now), "2 days ago");
        let old = now - Duration::days(90);
        assert_eq!(
            format_relative(old, now),
            old.format("%Y-%m-%d %H:%M").to_string()
        );
    }
}
