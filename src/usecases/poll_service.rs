//! Poll (daemon) use case: check watched repositories on a fixed interval and announce
//! new commits, issues and releases.
//!
//! Orchestrates FeedSource and NotificationEngine. Repositories are checked concurrently;
//! one failing repository never delays or aborts the others.

use crate::domain::{DomainError, RepoWatch};
use crate::ports::FeedSource;
use crate::usecases::engine::{Batch, CycleReport, NotificationEngine};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poll service. Runs a loop: fetch every repository -> engine -> wait for next tick.
pub struct PollService {
    feed: Arc<dyn FeedSource>,
    engine: Arc<NotificationEngine>,
    watches: Vec<RepoWatch>,
    /// Time between cycle starts.
    interval: Duration,
    /// Items fetched per event kind.
    max_items: usize,
    shutdown: CancellationToken,
}

impl PollService {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        engine: Arc<NotificationEngine>,
        watches: Vec<RepoWatch>,
        interval: Duration,
        max_items: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            feed,
            engine,
            watches,
            interval,
            max_items,
            shutdown,
        }
    }

    /// Run until shutdown. The first cycle starts immediately; a cycle always finishes
    /// before the next tick is awaited, so cycles never overlap.
    pub async fn run_loop(&self) {
        if self.watches.is_empty() {
            warn!("No repositories configured; GitHub polling disabled");
            return;
        }
        info!(
            repos = self.watches.len(),
            interval_secs = self.interval.as_secs(),
            "GitHub polling started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => break,
            }
            self.run_cycle().await;
        }
        info!("GitHub polling stopped");
    }

    /// Check every repository once.
    pub async fn run_cycle(&self) -> Vec<Result<CycleReport, DomainError>> {
        let checks = self.watches.iter().map(|watch| async move {
            let result = self.check_repo(watch).await;
            if let Err(e) = &result {
                warn!(repo = %watch.source_key(), error = %e, "repository check failed; skipping this cycle");
            }
            result
        });
        join_all(checks).await
    }

    /// Fetch one repository's recent activity and run it through the engine.
    pub async fn check_repo(&self, watch: &RepoWatch) -> Result<CycleReport, DomainError> {
        let source = watch.source_key();
        debug!(repo = %source, "checking repository");
        let items = self.feed.fetch_recent(watch, self.max_items).await?;
        let report = self
            .engine
            .process_batch(Batch::polled(source.clone(), items))
            .await;
        if report.novel > 0 && !report.baseline {
            info!(
                repo = %source,
                new_items = report.novel,
                delivered = report.tally.delivered,
                failed = report.tally.failed,
                "repository check complete"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CandidateItem, Commit, DispatchTarget, EventKind, EventTemplates, Filter, RuleTemplate,
        SourceKey, WatchRule,
    };
    use crate::usecases::dispatcher::Dispatcher;
    use crate::usecases::dispatcher::tests::RecordingTransport;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Serves scripted batches per repository, one per fetch.
    #[derive(Default)]
    struct ScriptedFeed {
        batches: Mutex<HashMap<String, VecDeque<Result<Vec<CandidateItem>, DomainError>>>>,
    }

    impl ScriptedFeed {
        fn push(&self, repo: &str, batch: Result<Vec<&str>, DomainError>) {
            let batch = batch.map(|shas| {
                shas.into_iter()
                    .map(|sha| {
                        CandidateItem::Commit(Commit {
                            repo: repo.into(),
                            sha: sha.into(),
                            author: "dev".into(),
                            message: format!("commit {}", sha),
                            url: String::new(),
                        })
                    })
                    .collect()
            });
            self.batches
                .lock()
                .unwrap()
                .entry(repo.to_string())
                .or_default()
                .push_back(batch);
        }
    }

    #[async_trait::async_trait]
    impl FeedSource for ScriptedFeed {
        async fn fetch_recent(
            &self,
            watch: &RepoWatch,
            _limit: usize,
        ) -> Result<Vec<CandidateItem>, DomainError> {
            self.batches
                .lock()
                .unwrap()
                .get_mut(&watch.name)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(vec![]))
        }
    }

    fn watch(name: &str) -> RepoWatch {
        RepoWatch {
            owner: "octo".into(),
            name: name.into(),
            display_name: name.into(),
            events: vec![EventKind::Commits],
        }
    }

    fn rule(name: &str, target: i64) -> WatchRule {
        WatchRule {
            name: name.into(),
            enabled: true,
            sources: [SourceKey::repo("octo", name)].into_iter().collect(),
            destinations: vec![DispatchTarget::room(target)],
            filters: vec![Filter::EventKinds(vec![EventKind::Commits])],
            template: RuleTemplate::PerKind(EventTemplates {
                new_commit: "{repo}: {message}".into(),
                new_issue: String::new(),
                new_release: String::new(),
            }),
            preserve_original_content: false,
        }
    }

    fn service(feed: Arc<ScriptedFeed>, transport: Arc<RecordingTransport>) -> PollService {
        let dispatcher = Dispatcher::new(
            transport,
            Duration::ZERO,
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        let engine = Arc::new(NotificationEngine::new(
            vec![rule("a", 1), rule("b", 2)],
            dispatcher,
        ));
        PollService::new(
            feed,
            engine,
            vec![watch("a"), watch("b")],
            Duration::from_secs(60),
            5,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn failing_repository_does_not_affect_others() {
        let feed = Arc::new(ScriptedFeed::default());
        let transport = Arc::new(RecordingTransport::default());
        feed.push("a", Ok(vec!["a1"]));
        feed.push("b", Ok(vec!["b1"]));
        feed.push("a", Err(DomainError::Source("HTTP 502".into())));
        feed.push("b", Ok(vec!["b2", "b1"]));
        let svc = service(Arc::clone(&feed), Arc::clone(&transport));

        svc.run_cycle().await;
        let second = svc.run_cycle().await;

        assert!(second[0].is_err());
        assert_eq!(second[1].as_ref().map(|r| r.novel).ok(), Some(1));
        assert_eq!(transport.texts(), vec!["b: commit b2"]);
    }

    #[tokio::test]
    async fn failed_first_fetch_keeps_baseline_pending() {
        let feed = Arc::new(ScriptedFeed::default());
        let transport = Arc::new(RecordingTransport::default());
        feed.push("a", Err(DomainError::Source("timeout".into())));
        feed.push("a", Ok(vec!["a1", "a0"]));
        let svc = service(Arc::clone(&feed), Arc::clone(&transport));

        svc.run_cycle().await;
        let reports = svc.run_cycle().await;

        let report = reports[0].as_ref().expect("second fetch succeeds");
        assert!(report.baseline);
        assert!(transport.targets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_stops_on_shutdown() {
        let feed = Arc::new(ScriptedFeed::default());
        let transport = Arc::new(RecordingTransport::default());
        let svc = Arc::new(service(feed, transport));
        let token = svc.shutdown.clone();

        let handle = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.run_loop().await }
        });
        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();
        handle.await.expect("poll loop exits cleanly");

        assert!(svc.engine.last_check(&SourceKey::repo("octo", "a")).is_some());
    }
}
