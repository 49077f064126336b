//! Implements InputPort and CredentialPrompt with inquire prompts.
//!
//! inquire blocks on the terminal, so every prompt runs on the blocking pool.

use crate::domain::{Chat, ChatType, DomainError};
use crate::ports::{ChatTransport, CredentialPrompt, InputPort};
use crate::usecases::NotificationEngine;
use async_trait::async_trait;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{InquireError, Password, Select, Text};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const AMBER: Color = Color::Rgb {
    r: 0xff,
    g: 0xb3,
    b: 0x00,
};
const TEAL: Color = Color::Rgb {
    r: 0x00,
    g: 0xb8,
    b: 0xa9,
};

/// Banner colors for all subsequent inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default_colored()
        .with_prompt_prefix(Styled::new("»").with_fg(AMBER))
        .with_highlighted_option_prefix(Styled::new("➤").with_fg(TEAL));
    inquire::set_global_render_config(config);
}

async fn blocking_prompt<T, F>(prompt: F) -> Result<T, InquireError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .map_err(|e| InquireError::Custom(Box::new(e)))?
}

fn chat_type_indicator(kind: ChatType) -> &'static str {
    match kind {
        ChatType::User => "[U]",
        ChatType::Group => "[G]",
        ChatType::Channel => "[C]",
    }
}

/// One line per chat, with the id operators copy into the configuration.
pub fn chat_listing(chats: &[Chat]) -> String {
    if chats.is_empty() {
        return "No chats found".to_string();
    }
    chats
        .iter()
        .map(|c| format!("{} {} ({})", chat_type_indicator(c.chat_type), c.title, c.id))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ShowStatus,
    ShowRules,
    ListChats,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [
        MenuAction::ShowStatus,
        MenuAction::ShowRules,
        MenuAction::ListChats,
        MenuAction::Quit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuAction::ShowStatus => "Show status",
            MenuAction::ShowRules => "Show rules",
            MenuAction::ListChats => "List chats",
            MenuAction::Quit => "Quit",
        })
    }
}

/// Operator console. Quitting cancels the shutdown token.
pub struct TuiInputPort {
    engine: Arc<NotificationEngine>,
    transport: Arc<dyn ChatTransport>,
    shutdown: CancellationToken,
}

impl TuiInputPort {
    pub fn new(
        engine: Arc<NotificationEngine>,
        transport: Arc<dyn ChatTransport>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            transport,
            shutdown,
        }
    }

    /// Text shown for a menu choice; `None` for Quit.
    pub async fn perform(&self, action: MenuAction) -> Result<Option<String>, DomainError> {
        Ok(match action {
            MenuAction::ShowStatus => Some(self.engine.status().to_string()),
            MenuAction::ShowRules => Some(crate::domain::describe_rules(self.engine.rules())),
            MenuAction::ListChats => Some(chat_listing(&self.transport.get_dialogs().await?)),
            MenuAction::Quit => None,
        })
    }

    /// No terminal to prompt on: run until Ctrl+C or until something else shuts down.
    async fn wait_headless(&self) {
        info!("No interactive terminal; press Ctrl+C to stop");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let choice = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                choice = blocking_prompt(|| {
                    Select::new("What next?", MenuAction::ALL.to_vec()).prompt()
                }) => choice,
            };
            let action = match choice {
                Ok(action) => action,
                Err(InquireError::NotTTY) => {
                    self.wait_headless().await;
                    break;
                }
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    MenuAction::Quit
                }
                Err(e) => return Err(DomainError::Console(e.to_string())),
            };
            match self.perform(action).await {
                Ok(Some(text)) => println!("\n{}\n", text),
                Ok(None) => break,
                Err(e) => warn!(error = %e, "menu action failed"),
            }
        }
        self.shutdown.cancel();
        Ok(())
    }
}

/// Login prompts on the terminal.
pub struct TuiCredentialPrompt;

fn console_error(e: InquireError) -> DomainError {
    DomainError::Console(e.to_string())
}

#[async_trait]
impl CredentialPrompt for TuiCredentialPrompt {
    async fn phone(&self) -> Result<String, DomainError> {
        blocking_prompt(|| {
            Text::new("Phone number (international format, e.g. +15551234567):").prompt()
        })
        .await
        .map_err(console_error)
    }

    async fn login_code(&self) -> Result<String, DomainError> {
        blocking_prompt(|| Text::new("Login code sent by Telegram:").prompt())
            .await
            .map_err(console_error)
    }

    async fn password(&self, hint: Option<&str>) -> Result<String, DomainError> {
        let message = match hint {
            Some(h) => format!("2FA password (hint: {}):", h),
            None => "2FA password:".to_string(),
        };
        blocking_prompt(move || Password::new(&message).without_confirmation().prompt())
            .await
            .map_err(console_error)
    }
}
