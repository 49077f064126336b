//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: operator console. Returns when the operator asks to quit.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    async fn run(&self) -> Result<(), DomainError>;
}
