//! Configuration parsing and validation.
//!
//! blogsync is configured via a TOML file (default: `config/blogsync.toml`).
//!
//! ```toml
//! [db]
//! path = "./data/blogsync.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [wordpress]
//! timeout_secs = 30
//! per_page = 100
//! max_pages = 10
//!
//! [credentials.main-site]
//! username = "editor"
//! password_env = "MAIN_SITE_WP_APP_PASSWORD"
//!
//! [workflow]
//! base_url = "https://automation.example.com/webhook"
//! api_key_env = "WORKFLOW_API_KEY"
//!
//! [webhook]
//! secret_env = "BLOGSYNC_WEBHOOK_SECRET"
//! ```
//!
//! Secrets may be given inline or through an `*_env` key naming an
//! environment variable. Environment lookups happen only when a value is
//! resolved for a single sync or webhook invocation, never deeper in the
//! call stack.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub wordpress: WordPressConfig,
    #[serde(default)]
    pub credentials: BTreeMap<String, CredentialConfig>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WordPressConfig {
    #[serde(default = "default_wp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_post_statuses")]
    pub post_statuses: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_wp_timeout_secs(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            post_statuses: default_post_statuses(),
            media_type: default_media_type(),
        }
    }
}

fn default_wp_timeout_secs() -> u64 {
    30
}
fn default_per_page() -> u32 {
    100
}
fn default_max_pages() -> u32 {
    10
}
fn default_post_statuses() -> String {
    "publish,draft,future,pending,private".to_string()
}
fn default_media_type() -> String {
    "image".to_string()
}

/// WordPress login for one or more blogs, referenced by name from
/// `Blog::wp_credential_ref`.
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialConfig {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
}

impl CredentialConfig {
    /// Resolve the application password, reading the environment if needed.
    pub fn resolve_password(&self) -> Result<String> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }
        let var = self
            .password_env
            .as_deref()
            .context("credential has neither password nor password_env")?;
        std::env::var(var).with_context(|| format!("environment variable {} not set", var))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Base URL of the automation engine's webhook endpoints. Unset disables triggers.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_blog_sync_path")]
    pub blog_sync_path: String,
    #[serde(default = "default_workflow_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            api_key_env: None,
            blog_sync_path: default_blog_sync_path(),
            timeout_secs: default_workflow_timeout_secs(),
        }
    }
}

impl WorkflowConfig {
    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

fn default_blog_sync_path() -> String {
    "blog-sync".to_string()
}
fn default_workflow_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub secret_env: Option<String>,
}

impl WebhookConfig {
    /// Shared secret for signature checks; `None` disables verification.
    pub fn resolve_secret(&self) -> Option<String> {
        self.secret.clone().or_else(|| {
            self.secret_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.wordpress.per_page == 0 || config.wordpress.per_page > 100 {
        bail!("wordpress.per_page must be in [1, 100]");
    }
    if config.wordpress.max_pages == 0 {
        bail!("wordpress.max_pages must be >= 1");
    }
    if config.wordpress.timeout_secs == 0 {
        bail!("wordpress.timeout_secs must be > 0");
    }

    for (name, cred) in &config.credentials {
        if cred.username.trim().is_empty() {
            bail!("credentials.{}.username must not be empty", name);
        }
        match (&cred.password, &cred.password_env) {
            (Some(_), Some(_)) => {
                bail!(
                    "credentials.{}: set either password or password_env, not both",
                    name
                )
            }
            (None, None) => bail!("credentials.{}: password or password_env is required", name),
            _ => {}
        }
    }

    if let Some(url) = &config.workflow.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("workflow.base_url must be an http(s) URL, got '{}'", url);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Result<Config> {
        let content = format!(
            r#"
[db]
path = "/tmp/blogsync.sqlite"

[server]
bind = "127.0.0.1:0"
{}
"#,
            extra
        );
        let config: Config = toml::from_str(&content)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.wordpress.per_page, 100);
        assert_eq!(config.wordpress.max_pages, 10);
        assert!(!config.workflow.is_enabled());
        assert_eq!(config.workflow.blog_sync_path, "blog-sync");
        assert!(config.webhook.resolve_secret().is_none());
    }

    #[test]
    fn test_per_page_out_of_range() {
        let err = parse("[wordpress]\nper_page = 500").unwrap_err();
        assert!(err.to_string().contains("per_page"));
    }

    #[test]
    fn test_credentials_need_exactly_one_password_source() {
        assert!(parse("[credentials.site]\nusername = \"ed\"").is_err());
        assert!(parse(
            "[credentials.site]\nusername = \"ed\"\npassword = \"a\"\npassword_env = \"B\""
        )
        .is_err());
        let config = parse("[credentials.site]\nusername = \"ed\"\npassword = \"pw\"").unwrap();
        assert_eq!(
            config.credentials["site"].resolve_password().unwrap(),
            "pw"
        );
    }

    #[test]
    fn test_workflow_url_must_be_http() {
        assert!(parse("[workflow]\nbase_url = \"ftp://x\"").is_err());
        let config = parse("[workflow]\nbase_url = \"https://hooks.example.com/webhook\"").unwrap();
        assert!(config.workflow.is_enabled());
    }
}
