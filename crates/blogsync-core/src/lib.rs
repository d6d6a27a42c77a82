//! # blogsync core
//!
//! Runtime-free domain logic shared by the `blogsync` server and CLI:
//! data models, the local/remote status vocabulary, text metrics, and the
//! [`store::ContentStore`] abstraction with an in-memory implementation.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies.

pub mod models;
pub mod status;
pub mod store;
pub mod text;
