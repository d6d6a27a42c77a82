//! # blogsync CLI
//!
//! The `blogsync` binary runs the dashboard API server and exposes the same
//! sync operations for scripting and cron.
//!
//! ## Usage
//!
//! ```bash
//! blogsync --config ./config/blogsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `blogsync init` | Create the SQLite database and run schema migrations |
//! | `blogsync serve` | Start the HTTP API |
//! | `blogsync sync <blog-id>` | Pull from or push to a blog's WordPress site |
//! | `blogsync logs <blog-id>` | Show the sync log, newest first |
//! | `blogsync blogs list` | List registered blogs |
//! | `blogsync blogs add` | Register a blog |
//! | `blogsync blogs enable/disable <id>` | Toggle syncing for a blog |
//! | `blogsync stats` | Dashboard counts per blog |
//!
//! ## Examples
//!
//! ```bash
//! blogsync init
//! blogsync blogs add --name "Garden Notes" --domain garden.example.com \
//!     --url https://garden.example.com --credential garden
//! blogsync sync 5f0c... --direction pull
//! blogsync sync 5f0c... --direction push --post 9a1b...
//! blogsync serve
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use blogsync::blogs::{self, AddBlog};
use blogsync::sync::{SyncDirection, SyncScope};
use blogsync::{config, logging, logs, migrate, server, stats, sync_cmd};

/// Multi-blog content dashboard backend with WordPress synchronization.
#[derive(Parser)]
#[command(name = "blogsync", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/blogsync.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it against an existing database is safe.
    Init,

    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind`.
    Serve,

    /// Run one sync pass for a blog.
    Sync {
        /// Blog id.
        blog_id: String,

        /// `pull` (WordPress to local) or `push` (local to WordPress).
        /// The wire names `wp_to_supabase` and `supabase_to_wp` are also accepted.
        #[arg(long, default_value = "pull")]
        direction: SyncDirection,

        /// Limit the pass to one local post.
        #[arg(long, conflicts_with = "remote_post")]
        post: Option<String>,

        /// Limit a pull to one WordPress post id.
        #[arg(long)]
        remote_post: Option<i64>,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a blog's sync log, newest first.
    Logs {
        blog_id: String,

        #[arg(long, default_value_t = 50)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Manage registered blogs.
    Blogs {
        #[command(subcommand)]
        action: BlogAction,
    },

    /// Show dashboard statistics.
    Stats {
        /// Restrict to one blog id.
        #[arg(long)]
        blog: Option<String>,
    },
}

#[derive(Subcommand)]
enum BlogAction {
    /// List registered blogs.
    List,
    /// Register a blog.
    Add {
        #[arg(long)]
        name: String,
        /// Public domain; scheme, `www.` and paths are stripped.
        #[arg(long)]
        domain: String,
        /// WordPress site URL.
        #[arg(long)]
        url: Option<String>,
        /// Name of a `[credentials.<name>]` entry in the config file.
        #[arg(long)]
        credential: Option<String>,
        #[arg(long)]
        niche: Option<String>,
    },
    /// Allow syncing for a blog.
    Enable { id: String },
    /// Stop syncing a blog without deleting its content.
    Disable { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Sync {
            blog_id,
            direction,
            post,
            remote_post,
            json,
        } => {
            let scope = match (post, remote_post) {
                (Some(id), _) => SyncScope::LocalPost(id),
                (None, Some(remote_id)) => SyncScope::RemotePost(remote_id),
                (None, None) => SyncScope::All,
            };
            sync_cmd::run_sync(&cfg, &blog_id, direction, scope, json).await?;
        }
        Commands::Logs {
            blog_id,
            limit,
            offset,
        } => {
            logs::run_logs(&cfg, &blog_id, limit, offset).await?;
        }
        Commands::Blogs { action } => match action {
            BlogAction::List => blogs::run_list(&cfg).await?,
            BlogAction::Add {
                name,
                domain,
                url,
                credential,
                niche,
            } => {
                blogs::run_add(
                    &cfg,
                    AddBlog {
                        name,
                        domain,
                        url,
                        credential,
                        niche,
                    },
                )
                .await?
            }
            BlogAction::Enable { id } => blogs::run_set_active(&cfg, &id, true).await?,
            BlogAction::Disable { id } => blogs::run_set_active(&cfg, &id, false).await?,
        },
        Commands::Stats { blog } => {
            stats::run_stats(&cfg, blog.as_deref()).await?;
        }
    }

    Ok(())
}
