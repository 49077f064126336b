//! GitHub adapter: recent commits, issues and releases over the REST API.

pub mod client;
pub mod models;

pub use client::{DEFAULT_API_URL, GitHubFeed};
