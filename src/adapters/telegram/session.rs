//! Session management. Load/save the grammers session file and connect.
//!
//! The session file keeps the authorization across restarts.

use crate::domain::DomainError;
use grammers_client::{Client, Config, InitParams};
use grammers_session::Session;
use std::path::Path;
use tracing::info;

/// Open (or create) the session file at `path` and connect to Telegram.
///
/// Updates that arrived while the bot was offline are not replayed.
pub async fn connect(path: &Path, api_id: i32, api_hash: &str) -> Result<Client, DomainError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DomainError::ChatTransport(format!("create session directory: {}", e))
        })?;
    }
    let session = Session::load_file_or_create(path)
        .map_err(|e| DomainError::ChatTransport(format!("open session file: {}", e)))?;

    info!(session = %path.display(), "connecting to Telegram");
    Client::connect(Config {
        session,
        api_id,
        api_hash: api_hash.to_string(),
        params: InitParams {
            catch_up: false,
            ..Default::default()
        },
    })
    .await
    .map_err(|e| DomainError::ChatTransport(format!("connect: {}", e)))
}

pub fn save(client: &Client, path: &Path) -> Result<(), DomainError> {
    client
        .session()
        .save_to_file(path)
        .map_err(|e| DomainError::ChatTransport(format!("save session file: {}", e)))
}
