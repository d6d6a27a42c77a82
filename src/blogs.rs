//! Blog registry commands.
//!
//! Backs `blogsync blogs list|add|enable|disable`. Credentials are never
//! stored with the blog; `--credential` names a `[credentials.<name>]` entry
//! in the config file.

use anyhow::{bail, Result};

use blogsync_core::models::{Blog, BlogFilter, NewBlog};
use blogsync_core::store::ContentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::webhook::site_domain;

/// Print every registered blog with its activation state and credential reference.
pub async fn run_list(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let blogs = store.list_blogs(&BlogFilter::default()).await?;

    if blogs.is_empty() {
        println!("No blogs registered. Add one with `blogsync blogs add`.");
        return Ok(());
    }

    println!(
        "{:<38} {:<28} {:<8} {:<12} NAME",
        "ID", "DOMAIN", "ACTIVE", "CREDENTIAL"
    );
    for blog in &blogs {
        println!("{}", format_row(blog, config));
    }

    store.pool().close().await;
    Ok(())
}

fn format_row(blog: &Blog, config: &Config) -> String {
    let credential = match blog.wp_credential_ref.as_deref() {
        Some(name) if config.credentials.contains_key(name) => name.to_string(),
        Some(name) => format!("{} (missing)", name),
        None => "-".to_string(),
    };
    format!(
        "{:<38} {:<28} {:<8} {:<12} {}",
        blog.id,
        blog.domain,
        if blog.is_active { "yes" } else { "no" },
        credential,
        blog.name
    )
}

/// Arguments for `blogs add`.
pub struct AddBlog {
    pub name: String,
    pub domain: String,
    pub url: Option<String>,
    pub credential: Option<String>,
    pub niche: Option<String>,
}

/// Register a blog. The domain is normalized the same way webhook
/// deliveries are matched.
pub async fn run_add(config: &Config, args: AddBlog) -> Result<()> {
    let domain = site_domain(&args.domain);
    if domain.is_empty() {
        bail!("domain must not be empty");
    }
    if let Some(name) = &args.credential {
        if !config.credentials.contains_key(name) {
            tracing::warn!(credential = %name, "credential is not defined in the config file");
        }
    }

    let store = SqliteStore::open(config).await?;
    if store.find_blog_by_domain(&domain).await?.is_some() {
        bail!("a blog with domain {} is already registered", domain);
    }

    let blog = store
        .create_blog(&NewBlog {
            name: args.name,
            domain,
            niche: args.niche,
            description: None,
            wp_api_url: args.url,
            wp_credential_ref: args.credential,
        })
        .await?;

    println!("Registered {} ({})", blog.domain, blog.id);
    store.pool().close().await;
    Ok(())
}

/// Enable or disable syncing for a blog.
pub async fn run_set_active(config: &Config, id: &str, active: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    if !store.set_blog_active(id, active).await? {
        bail!("blog not found: {}", id);
    }
    println!(
        "Blog {} {}.",
        id,
        if active { "enabled" } else { "disabled" }
    );
    store.pool().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn blog(credential: Option<&str>, active: bool) -> Blog {
        Blog {
            id: "b1".into(),
            name: "Garden Notes".into(),
            domain: "garden.example.com".into(),
            niche: None,
            description: None,
            wp_api_url: None,
            wp_credential_ref: credential.map(str::to_string),
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config() -> Config {
        toml::from_str("[db]\npath = \"/tmp/b.sqlite\"\n[server]\nbind = \"127.0.0.1:0\"\n")
            .unwrap()
    }

    #[test]
    fn test_row_flags_missing_credential() {
        let config = config();
        let row = format_row(&blog(Some("garden"), true), &config);
        assert!(row.contains("garden (missing)"));
        assert!(row.contains("yes"));
    }

    #[test]
    fn test_row_without_credential() {
        let row = format_row(&blog(None, false), &config());
        assert!(row.contains(" no "));
        assert!(row.ends_with("Garden Notes"));
    }
}
