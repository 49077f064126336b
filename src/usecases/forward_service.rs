//! Forward use case: route inbound chat messages through the engine.
//!
//! Each room gets its own bounded queue and worker task, so a room's messages are handled
//! in arrival order while different rooms proceed independently.

use crate::domain::{CandidateItem, ChatMessage, SourceKey};
use crate::ports::InboundSource;
use crate::usecases::engine::{Batch, CycleReport, NotificationEngine};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Messages buffered per room before the receive loop waits (backpressure).
const ROOM_QUEUE_CAPACITY: usize = 256;

/// Pause after a transport error before asking for the next message.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(5);

struct RoomWorker {
    tx: mpsc::Sender<ChatMessage>,
    handle: JoinHandle<()>,
}

pub struct ForwardService {
    inbound: Arc<dyn InboundSource>,
    engine: Arc<NotificationEngine>,
    /// Id of the bot's own account; its messages are never forwarded.
    me_id: i64,
    shutdown: CancellationToken,
}

impl ForwardService {
    pub fn new(
        inbound: Arc<dyn InboundSource>,
        engine: Arc<NotificationEngine>,
        me_id: i64,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inbound,
            engine,
            me_id,
            shutdown,
        }
    }

    /// True for messages this account sent itself.
    fn is_own(&self, msg: &ChatMessage) -> bool {
        msg.outgoing || msg.sender_id == Some(self.me_id)
    }

    /// True for messages from chats that no enabled rule watches.
    fn is_unmonitored(&self, msg: &ChatMessage) -> bool {
        !self.engine.watches(&SourceKey::chat(msg.chat_id))
    }

    /// Process one inbound message to completion. Returns `None` when it is ignored
    /// before reaching the engine (own message, unmonitored chat, or no text content).
    pub async fn handle_message(&self, msg: ChatMessage) -> Option<CycleReport> {
        if self.is_own(&msg) {
            debug!(chat_id = msg.chat_id, msg_id = msg.id, "ignoring own message");
            return None;
        }
        if self.is_unmonitored(&msg) {
            return None;
        }
        if msg.plain_text().trim().is_empty() {
            return None;
        }
        debug!(
            chat_id = msg.chat_id,
            msg_id = msg.id,
            preview = %truncate(&msg.plain_text(), 50),
            "inbound message"
        );
        let source = SourceKey::chat(msg.chat_id);
        Some(
            self.engine
                .process_batch(Batch::pushed(source, CandidateItem::ChatMessage(msg)))
                .await,
        )
    }

    /// Receive messages until the stream ends or shutdown is requested, then wait for
    /// every room worker to drain its queue.
    pub async fn run_loop(self: Arc<Self>) {
        info!("Chat forwarding started");
        let mut rooms: HashMap<i64, RoomWorker> = HashMap::new();

        loop {
            let next = tokio::select! {
                next = self.inbound.next_message() => next,
                _ = self.shutdown.cancelled() => break,
            };
            let msg = match next {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    info!("inbound stream closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "receiving inbound message failed");
                    tokio::select! {
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => continue,
                        _ = self.shutdown.cancelled() => break,
                    }
                }
            };
            if self.is_own(&msg) || self.is_unmonitored(&msg) {
                continue;
            }

            let worker = rooms
                .entry(msg.chat_id)
                .or_insert_with(|| self.spawn_room_worker(msg.chat_id));
            if worker.tx.send(msg).await.is_err() {
                warn!("room worker stopped unexpectedly; message dropped");
            }
        }

        for (chat_id, worker) in rooms {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                warn!(chat_id, error = %e, "room worker panicked");
            }
        }
        info!("Chat forwarding stopped");
    }

    fn spawn_room_worker(self: &Arc<Self>, chat_id: i64) -> RoomWorker {
        let (tx, mut rx) = mpsc::channel::<ChatMessage>(ROOM_QUEUE_CAPACITY);
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                service.handle_message(msg).await;
            }
            debug!(chat_id, "room worker finished (channel closed)");
        });
        RoomWorker { tx, handle }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
