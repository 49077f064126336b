//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    CandidateItem, Chat, ChatMessage, DispatchTarget, DomainError, OutboundMessage, RepoWatch,
    SignInResult,
};

/// Chat transport: sends notifications and describes the logged-in account.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Id of the account the bot runs as. Messages from this id are never forwarded.
    async fn me_id(&self) -> Result<i64, DomainError>;

    /// Fetch all dialogs (chats) the account participates in.
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError>;

    /// Deliver one message to one target. Any transport-level failure is an `Err`.
    async fn send(
        &self,
        target: &DispatchTarget,
        message: &OutboundMessage,
    ) -> Result<(), DomainError>;
}

/// Push adapter: inbound chat messages, in arrival order.
#[async_trait::async_trait]
pub trait InboundSource: Send + Sync {
    /// Wait for the next inbound message. `Ok(None)` means the stream has ended.
    async fn next_message(&self) -> Result<Option<ChatMessage>, DomainError>;
}

/// Poll adapter: recent activity of one repository.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Up to `limit` most recent items per watched event kind, newest first within a kind.
    ///
    /// Fails as a whole if any watched kind cannot be fetched, so a partial batch is never
    /// mistaken for the full recent history.
    async fn fetch_recent(
        &self,
        watch: &RepoWatch,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, DomainError>;
}

/// Login against the chat transport.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, DomainError>;

    async fn request_login_code(&self, phone: &str) -> Result<(), DomainError>;

    /// Submit the code received for the last `request_login_code`.
    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError>;

    /// Check the 2FA password after `sign_in` returned `PasswordRequired`.
    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError>;

    /// Persist the authorized session.
    async fn save_session(&self) -> Result<(), DomainError>;
}

/// Asks the operator for login credentials.
#[async_trait::async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn phone(&self) -> Result<String, DomainError>;

    async fn login_code(&self) -> Result<String, DomainError>;

    async fn password(&self, hint: Option<&str>) -> Result<String, DomainError>;
}
