//! Handle Login / 2FA flow. Delegates to AuthPort (transport) and CredentialPrompt (operator).

use crate::domain::{DomainError, SignInResult};
use crate::ports::{AuthPort, CredentialPrompt};
use std::sync::Arc;
use tracing::info;

pub struct AuthService {
    auth: Arc<dyn AuthPort>,
    prompt: Arc<dyn CredentialPrompt>,
    /// Phone from configuration; prompted for when absent.
    phone: Option<String>,
}

impl AuthService {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        prompt: Arc<dyn CredentialPrompt>,
        phone: Option<String>,
    ) -> Self {
        Self {
            auth,
            prompt,
            phone,
        }
    }

    /// Run full auth flow (phone -> code -> 2FA if needed). No-op when the stored session
    /// is already authorized.
    pub async fn run_auth_flow(&self) -> Result<(), DomainError> {
        if self.auth.is_authenticated().await? {
            info!("session already authorized");
            return Ok(());
        }

        let phone = match self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(p) => p.to_string(),
            None => self.prompt.phone().await?,
        };
        self.auth.request_login_code(phone.trim()).await?;

        let code = self.prompt.login_code().await?;
        match self.auth.sign_in(code.trim()).await? {
            SignInResult::Success => {}
            SignInResult::PasswordRequired { hint } => {
                let password = self.prompt.password(hint.as_deref()).await?;
                self.auth.check_password(password.as_bytes()).await?;
            }
        }

        self.auth.save_session().await?;
        info!("signed in; session saved");
        Ok(())
    }
}
