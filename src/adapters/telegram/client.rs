//! Implements ChatTransport and InboundSource using grammers Client.
//!
//! A FloodWait on send is a failed delivery; the dispatcher counts it and moves on. Resolved
//! chats are cached as PackedChat so a send does not walk the dialog list every time.

use crate::adapters::telegram::mapper::{self, DeliveryStep};
use crate::domain::{Chat, ChatMessage, DispatchTarget, DomainError, OutboundMessage};
use crate::ports::{ChatTransport, InboundSource};
use async_trait::async_trait;
use grammers_client::types::PackedChat;
use grammers_client::{Client, InvocationError, Update};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Telegram transport adapter. Clones of the grammers Client share one connection.
pub struct GrammersTransport {
    client: Client,
    /// PackedChat by chat id, filled from dialogs and inbound messages.
    peer_cache: Mutex<HashMap<i64, PackedChat>>,
}

impl GrammersTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            peer_cache: Mutex::new(HashMap::new()),
        }
    }

    async fn remember(&self, chat: &grammers_client::types::Chat) {
        self.peer_cache.lock().await.insert(chat.id(), chat.pack());
    }

    /// Resolve chat id to PackedChat, walking the dialog list only on a cache miss.
    async fn resolve(&self, chat_id: i64) -> Result<PackedChat, DomainError> {
        if let Some(packed) = self.peer_cache.lock().await.get(&chat_id).cloned() {
            return Ok(packed);
        }
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs
            .next()
            .await
            .map_err(|e| DomainError::ChatTransport(e.to_string()))?
        {
            let chat = dialog.chat();
            self.remember(chat).await;
            if chat.id() == chat_id {
                return Ok(chat.pack());
            }
        }
        Err(DomainError::ChatTransport(format!(
            "chat {} not found in dialogs",
            chat_id
        )))
    }
}

/// Map a failed delivery request. FLOOD_WAIT is reported as a failure, never waited out.
fn send_error(e: InvocationError) -> DomainError {
    match e {
        InvocationError::Rpc(rpc) if rpc.code == 420 => {
            DomainError::ChatTransport(flood_wait_message(rpc.value))
        }
        e => DomainError::ChatTransport(e.to_string()),
    }
}

/// Note how far a multi-call delivery got before `e`.
fn partial_failure(e: DomainError, done: usize, total: usize) -> DomainError {
    match e {
        DomainError::ChatTransport(msg) if done > 0 => DomainError::ChatTransport(format!(
            "{} ({} of {} parts already delivered)",
            msg, done, total
        )),
        e => e,
    }
}

fn flood_wait_message(wait_secs: Option<u32>) -> String {
    match wait_secs {
        Some(secs) => format!("FloodWait: Telegram asks to wait {} seconds before sending", secs),
        None => "FloodWait: Telegram is rate limiting sends".to_string(),
    }
}

#[async_trait]
impl ChatTransport for GrammersTransport {
    async fn me_id(&self) -> Result<i64, DomainError> {
        let me = self
            .client
            .get_me()
            .await
            .map_err(|e| DomainError::ChatTransport(e.to_string()))?;
        Ok(me.id())
    }

    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError> {
        let mut dialogs = self.client.iter_dialogs();
        let mut chats = Vec::new();
        while let Some(dialog) = dialogs
            .next()
            .await
            .map_err(|e| DomainError::ChatTransport(e.to_string()))?
        {
            let chat = dialog.chat();
            self.remember(chat).await;
            chats.push(mapper::chat_to_domain(chat));
        }
        Ok(chats)
    }

    async fn send(
        &self,
        target: &DispatchTarget,
        message: &OutboundMessage,
    ) -> Result<(), DomainError> {
        let dest = self.resolve(target.chat_id).await?;
        let plan = mapper::delivery_plan(message);
        let mut sources = HashMap::new();
        for chat_id in mapper::forward_sources(&plan) {
            sources.insert(chat_id, self.resolve(chat_id).await?);
        }
        let total = plan.len();
        for (done, step) in plan.into_iter().enumerate() {
            let sent = match step {
                DeliveryStep::Text(text) => self
                    .client
                    .send_message(dest.clone(), text.as_str())
                    .await
                    .map(|_| ()),
                DeliveryStep::Forward {
                    chat_id,
                    message_id,
                } => {
                    let Some(source) = sources.get(&chat_id).cloned() else {
                        return Err(DomainError::ChatTransport(format!(
                            "chat {} not resolved",
                            chat_id
                        )));
                    };
                    self.client
                        .forward_messages(dest.clone(), &[message_id], source)
                        .await
                        .map(|_| ())
                }
            };
            if let Err(e) = sent {
                return Err(partial_failure(send_error(e), done, total));
            }
        }
        debug!(target = %target, "message sent");
        Ok(())
    }
}

#[async_trait]
impl InboundSource for GrammersTransport {
    async fn next_message(&self) -> Result<Option<ChatMessage>, DomainError> {
        loop {
            let update = self
                .client
                .next_update()
                .await
                .map_err(|e| DomainError::ChatTransport(e.to_string()))?;
            if let Update::NewMessage(msg) = update {
                self.remember(&msg.chat()).await;
                return Ok(Some(mapper::message_to_domain(&msg)));
            }
        }
    }
}
