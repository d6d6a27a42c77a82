//! `blogsync sync`: run one pass from the command line and print its report.

use std::sync::Arc;

use anyhow::Result;

use blogsync_core::store::ContentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::sync::{ItemOutcome, SyncCoordinator, SyncDirection, SyncReport, SyncScope};

pub async fn run_sync(
    config: &Config,
    blog_id: &str,
    direction: SyncDirection,
    scope: SyncScope,
    json: bool,
) -> Result<()> {
    let store: Arc<dyn ContentStore> = Arc::new(SqliteStore::open(config).await?);
    let coordinator = SyncCoordinator::from_config(config, store)?;

    let report = coordinator.synchronize(blog_id, direction, scope).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("sync {}", report.direction);
    println!("  posts synced: {}", report.posts_synced);
    println!("  media synced: {}", report.media_synced);
    println!("  errors:       {}", report.errors);
    if let Some(err) = &report.media_error {
        println!("  media listing failed: {}", err);
    }

    let notable = report
        .posts
        .iter()
        .chain(report.media.iter())
        .filter(|o| o.is_error() || o.diverged);
    for outcome in notable {
        println!("  {}", describe(outcome));
    }
}

fn describe(outcome: &ItemOutcome) -> String {
    let who = match (&outcome.title, outcome.remote_id) {
        (Some(title), Some(id)) => format!("\"{}\" (wp #{})", title, id),
        (Some(title), None) => format!("\"{}\"", title),
        (None, Some(id)) => format!("wp #{}", id),
        (None, None) => outcome.id.clone().unwrap_or_else(|| "?".to_string()),
    };
    if outcome.is_error() {
        format!(
            "error {}: {}",
            who,
            outcome.message.as_deref().unwrap_or("unknown")
        )
    } else {
        format!("overwrote local edits to {}", who)
    }
}
