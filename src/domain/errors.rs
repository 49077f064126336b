//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Chat transport error: {0}")]
    ChatTransport(String),

    /// Upstream feed (GitHub API) could not be read. The source-key's cycle is skipped.
    #[error("Source fetch failed: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Timed out after {seconds} seconds: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Console error: {0}")]
    Console(String),
}
