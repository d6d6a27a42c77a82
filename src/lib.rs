//! # blogsync
//!
//! Backend for a dashboard that manages several WordPress blogs from one
//! place. Each blog's posts and media are mirrored into a local store and
//! kept in step with WordPress in both directions.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  REST + Basic auth  ┌──────────────────┐   ┌──────────┐
//! │ WordPress  │◀───────────────────▶│ SyncCoordinator  │──▶│  SQLite  │
//! │  (N sites) │                     │  pull / push     │   │  store   │
//! └─────┬──────┘                     └────────┬─────────┘   └────┬─────┘
//!       │ webhook                             │ blog-sync        │
//!       ▼                                     ▼                  │
//! ┌────────────┐                      ┌──────────────┐           │
//! │ /api/sync/ │                      │  workflow    │           │
//! │  webhook   │                      │  engine      │           │
//! └────────────┘                      └──────────────┘           │
//!       ▲                                                        │
//!       └───────── HTTP API (axum) ◀─────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Sync error taxonomy and HTTP status mapping |
//! | [`db`] / [`migrate`] | SQLite connection and schema |
//! | [`sqlite_store`] | SQLite implementation of the content store |
//! | [`wordpress`] | WordPress REST client and credential resolution |
//! | [`workflow`] | Outbound workflow-engine trigger |
//! | [`sync`] | Pull/push reconciliation |
//! | [`webhook`] | Inbound WordPress change notifications |
//! | [`server`] | HTTP API |
//!
//! Domain types and the storage trait live in [`blogsync_core`].

pub mod blogs;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod logs;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod sync;
pub mod sync_cmd;
pub mod webhook;
pub mod wordpress;
pub mod workflow;

#[cfg(test)]
mod fakes;

pub use blogsync_core;
