//! Delivers rendered notifications to their targets.
//!
//! - Targets are served sequentially; a fixed pause separates consecutive sends
//!   process-wide (pacing against upstream rate limits)
//! - Each send is independent: a failure is logged and counted, remaining targets still run
//! - No retries
//! - Shutdown is observed between sends, never in the middle of one

use crate::domain::{DispatchTarget, DomainError, OutboundMessage};
use crate::ports::ChatTransport;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default pause between two sends.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(1000);

/// Per-target delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    pub target: DispatchTarget,
    pub delivery: Delivery,
}

impl NotificationResult {
    pub fn is_delivered(&self) -> bool {
        self.delivery == Delivery::Delivered
    }
}

/// Success / failure counters. Reporting only; never drives retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchTally {
    pub delivered: u64,
    pub failed: u64,
}

impl DispatchTally {
    pub fn record(&mut self, result: &NotificationResult) {
        if result.is_delivered() {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn add(&mut self, other: DispatchTally) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }

    pub fn from_results(results: &[NotificationResult]) -> Self {
        let mut tally = Self::default();
        for r in results {
            tally.record(r);
        }
        tally
    }
}

/// Serializes sends and holds each one `interval` away from the previous one's completion.
struct Pacer {
    interval: Duration,
    last_send: tokio::sync::Mutex<Option<Instant>>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: tokio::sync::Mutex::new(None),
        }
    }

    /// Wait for the next slot, then run `send` while holding it.
    /// Returns `None` if `shutdown` fires while waiting; a started send always completes.
    async fn paced<F, T>(&self, shutdown: &CancellationToken, send: F) -> Option<T>
    where
        F: std::future::Future<Output = T>,
    {
        let mut last_send = self.last_send.lock().await;
        if shutdown.is_cancelled() {
            return None;
        }
        if let Some(at) = *last_send {
            tokio::select! {
                _ = tokio::time::sleep_until(at + self.interval) => {}
                _ = shutdown.cancelled() => return None,
            }
        }
        let out = send.await;
        *last_send = Some(Instant::now());
        Some(out)
    }
}

pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    pacer: Pacer,
    send_timeout: Duration,
    shutdown: CancellationToken,
    totals: Mutex<DispatchTally>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        send_interval: Duration,
        send_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            pacer: Pacer::new(send_interval),
            send_timeout,
            shutdown,
            totals: Mutex::new(DispatchTally::default()),
        }
    }

    /// Send `message` to each target in order. Returns one result per attempted target;
    /// targets left unattempted because of shutdown are omitted.
    pub async fn dispatch(
        &self,
        message: &OutboundMessage,
        targets: &[DispatchTarget],
    ) -> Vec<NotificationResult> {
        let mut results = Vec::with_capacity(targets.len());

        for target in targets {
            let Some(outcome) = self
                .pacer
                .paced(&self.shutdown, self.send_one(target, message))
                .await
            else {
                info!(
                    remaining = targets.len() - results.len(),
                    "shutdown requested; stopping dispatch"
                );
                break;
            };

            let delivery = match outcome {
                Ok(()) => {
                    info!(%target, "notification delivered");
                    Delivery::Delivered
                }
                Err(e) => {
                    warn!(%target, error = %e, "notification delivery failed");
                    Delivery::Failed(e.to_string())
                }
            };
            let result = NotificationResult {
                target: *target,
                delivery,
            };
            self.totals
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(&result);
            results.push(result);
        }

        results
    }

    async fn send_one(
        &self,
        target: &DispatchTarget,
        message: &OutboundMessage,
    ) -> Result<(), DomainError> {
        match tokio::time::timeout(self.send_timeout, self.transport.send(target, message)).await
        {
            Ok(res) => res,
            Err(_) => Err(DomainError::Timeout {
                operation: format!("send to {}", target),
                seconds: self.send_timeout.as_secs(),
            }),
        }
    }

    /// Cumulative counters since start.
    pub fn totals(&self) -> DispatchTally {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Chat;
    use std::collections::HashSet;

    /// Records every send; fails for the configured chat ids.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub sent: Mutex<Vec<(DispatchTarget, OutboundMessage, Instant)>>,
        pub failing: HashSet<i64>,
        pub latency: Duration,
    }

    impl RecordingTransport {
        pub fn failing(ids: &[i64]) -> Self {
            Self {
                failing: ids.iter().copied().collect(),
                ..Default::default()
            }
        }

        pub fn targets(&self) -> Vec<i64> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(t, _, _)| t.chat_id)
                .collect()
        }

        pub fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, m, _)| m.preview())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for RecordingTransport {
        async fn me_id(&self) -> Result<i64, DomainError> {
            Ok(1)
        }

        async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError> {
            Ok(vec![])
        }

        async fn send(
            &self,
            target: &DispatchTarget,
            message: &OutboundMessage,
        ) -> Result<(), DomainError> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.failing.contains(&target.chat_id) {
                return Err(DomainError::ChatTransport("result code 1".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((*target, message.clone(), Instant::now()));
            Ok(())
        }
    }

    fn dispatcher(transport: Arc<RecordingTransport>, interval: Duration) -> Dispatcher {
        Dispatcher::new(
            transport,
            interval,
            Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    fn rooms(ids: &[i64]) -> Vec<DispatchTarget> {
        ids.iter().map(|&id| DispatchTarget::room(id)).collect()
    }

    #[tokio::test]
    async fn failure_of_one_target_does_not_stop_the_rest() {
        let transport = Arc::new(RecordingTransport::failing(&[2]));
        let d = dispatcher(Arc::clone(&transport), Duration::ZERO);

        let results = d.dispatch(&OutboundMessage::text("hi"), &rooms(&[1, 2, 3])).await;

        assert_eq!(transport.targets(), vec![1, 3]);
        assert!(results[0].is_delivered());
        assert!(matches!(results[1].delivery, Delivery::Failed(_)));
        assert!(results[2].is_delivered());
        assert_eq!(
            DispatchTally::from_results(&results),
            DispatchTally {
                delivered: 2,
                failed: 1
            }
        );
        assert_eq!(d.totals().failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_sends_are_spaced_by_interval() {
        let transport = Arc::new(RecordingTransport::default());
        let d = dispatcher(Arc::clone(&transport), Duration::from_millis(1000));

        d.dispatch(&OutboundMessage::text("a"), &rooms(&[1, 2])).await;
        d.dispatch(&OutboundMessage::text("b"), &rooms(&[3])).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        for pair in sent.windows(2) {
            assert!(pair[1].2 - pair[0].2 >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_send_times_out_as_failure() {
        let transport = Arc::new(RecordingTransport {
            latency: Duration::from_secs(60),
            ..Default::default()
        });
        let d = dispatcher(Arc::clone(&transport), Duration::ZERO);

        let results = d.dispatch(&OutboundMessage::text("x"), &rooms(&[1])).await;

        assert!(matches!(&results[0].delivery, Delivery::Failed(reason) if reason.contains("Timed out")));
    }

    #[tokio::test]
    async fn cancelled_dispatch_sends_nothing_further() {
        let transport = Arc::new(RecordingTransport::default());
        let token = CancellationToken::new();
        let d = Dispatcher::new(
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Duration::ZERO,
            Duration::from_secs(5),
            token.clone(),
        );
        token.cancel();

        let results = d.dispatch(&OutboundMessage::text("x"), &rooms(&[1, 2])).await;

        assert!(results.is_empty());
        assert!(transport.targets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_send_finishes_it_and_skips_the_rest() {
        let transport = Arc::new(RecordingTransport {
            latency: Duration::from_secs(2),
            ..Default::default()
        });
        let token = CancellationToken::new();
        let d = Arc::new(Dispatcher::new(
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Duration::ZERO,
            Duration::from_secs(5),
            token.clone(),
        ));

        let running = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.dispatch(&OutboundMessage::text("x"), &rooms(&[1, 2])).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        let results = running.await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].is_delivered());
        assert_eq!(transport.targets(), vec![1]);
        assert_eq!(d.totals().delivered, 1);
    }
}
