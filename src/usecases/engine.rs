//! Notification engine: the one dedup -> match -> render -> dispatch pipeline shared by the
//! poll-driven (GitHub) and event-driven (chat) drivers.
//!
//! The engine owns all mutable state (seen sets, last-check times). Rules are immutable.
//! Work for one source-key is serialized; different source-keys run concurrently.

use crate::domain::{
    CandidateItem, DispatchTarget, Observable, SourceKey, WatchRule, describe_rules, evaluate,
    render_notification,
};
use crate::usecases::dispatcher::{DispatchTally, Dispatcher};
use crate::usecases::seen_store::SeenStore;
use chrono::{DateTime, Local, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// How the first batch of a source-key is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// Pull sources: the first cycle only records what already exists.
    SilentFirstCycle,
    /// Push sources: every item arrives live, nothing to absorb.
    AnnounceAll,
}

/// One unit of work from a source adapter.
#[derive(Debug, Clone)]
pub struct Batch {
    pub source: SourceKey,
    pub items: Vec<CandidateItem>,
    pub policy: BaselinePolicy,
}

impl Batch {
    pub fn polled(source: SourceKey, items: Vec<CandidateItem>) -> Self {
        Self {
            source,
            items,
            policy: BaselinePolicy::SilentFirstCycle,
        }
    }

    pub fn pushed(source: SourceKey, item: CandidateItem) -> Self {
        Self {
            source,
            items: vec![item],
            policy: BaselinePolicy::AnnounceAll,
        }
    }
}

/// Outcome of processing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub baseline: bool,
    pub novel: usize,
    /// Dispatch passes, one per (item, matching rule).
    pub dispatches: usize,
    pub tally: DispatchTally,
}

pub struct NotificationEngine {
    rules: Arc<[WatchRule]>,
    /// Sources listed by at least one enabled rule.
    watched: BTreeSet<SourceKey>,
    seen: SeenStore,
    dispatcher: Dispatcher,
    last_checks: Mutex<BTreeMap<SourceKey, DateTime<Utc>>>,
    source_locks: Mutex<HashMap<SourceKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl NotificationEngine {
    pub fn new(rules: Vec<WatchRule>, dispatcher: Dispatcher) -> Self {
        let watched = rules
            .iter()
            .filter(|r| r.enabled)
            .flat_map(|r| r.sources.iter().cloned())
            .collect();
        Self {
            rules: rules.into(),
            watched,
            seen: SeenStore::new(),
            dispatcher,
            last_checks: Mutex::new(BTreeMap::new()),
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// True when an enabled rule lists `source`. Batches from other sources leave no state.
    pub fn watches(&self, source: &SourceKey) -> bool {
        self.watched.contains(source)
    }

    fn source_lock(&self, source: &SourceKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .source_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(source.clone()).or_default())
    }

    /// Run one batch through the pipeline. Never fails: delivery problems are counted.
    pub async fn process_batch(&self, batch: Batch) -> CycleReport {
        if !self.watches(&batch.source) {
            debug!(source = %batch.source, "no enabled rule watches this source; batch dropped");
            return CycleReport::default();
        }
        let lock = self.source_lock(&batch.source);
        let _guard = lock.lock().await;

        let source = &batch.source;
        let mut report = CycleReport {
            baseline: batch.policy == BaselinePolicy::SilentFirstCycle
                && self.seen.is_baseline_cycle(source),
            ..Default::default()
        };

        for item in &batch.items {
            let identity = item.identity();
            if !self.seen.is_novel(source, &identity) {
                continue;
            }
            report.novel += 1;
            if report.baseline {
                continue;
            }

            for m in evaluate(item, source, &self.rules) {
                let message = render_notification(m.rule, item);
                debug!(
                    rule = %m.rule.name,
                    %source,
                    identity = %identity,
                    targets = m.destinations.len(),
                    "dispatching"
                );
                let results = self.dispatcher.dispatch(&message, &m.destinations).await;
                let tally = DispatchTally::from_results(&results);
                info!(
                    rule = %m.rule.name,
                    %source,
                    delivered = tally.delivered,
                    failed = tally.failed,
                    "rule dispatch finished"
                );
                report.dispatches += 1;
                report.tally.add(tally);
            }
        }

        if report.baseline {
            info!(
                %source,
                absorbed = report.novel,
                "baseline recorded; existing items will not be announced"
            );
        }

        self.last_checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.clone(), Utc::now());

        report
    }

    pub fn last_check(&self, source: &SourceKey) -> Option<DateTime<Utc>> {
        self.last_checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .copied()
    }

    /// Distinct destinations of enabled rules.
    pub fn destinations(&self) -> BTreeSet<DispatchTarget> {
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .flat_map(|r| r.destinations.iter().copied())
            .collect()
    }

    pub fn status(&self) -> EngineStatus {
        let enabled: Vec<&WatchRule> = self.rules.iter().filter(|r| r.enabled).collect();
        let sources: BTreeSet<&SourceKey> = enabled.iter().flat_map(|r| &r.sources).collect();
        EngineStatus {
            enabled_rules: enabled.len(),
            sources: sources.len(),
            destinations: self.destinations().len(),
            last_checks: self
                .last_checks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            totals: self.dispatcher.totals(),
            rule_listing: describe_rules(&self.rules),
        }
    }
}

/// Snapshot for the operator console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub enabled_rules: usize,
    pub sources: usize,
    pub destinations: usize,
    pub last_checks: BTreeMap<SourceKey, DateTime<Utc>>,
    pub totals: DispatchTally,
    pub rule_listing: String,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Active rules: {}", self.enabled_rules)?;
        writeln!(f, "Watched sources: {}", self.sources)?;
        writeln!(f, "Destinations: {}", self.destinations)?;
        writeln!(
            f,
            "Notifications: {} delivered, {} failed",
            self.totals.delivered, self.totals.failed
        )?;
        if self.last_checks.is_empty() {
            write!(f, "Last check: never")
        } else {
            write!(f, "Last checks:")?;
            for (source, at) in &self.last_checks {
                let local = at.with_timezone(&Local);
                write!(f, "\n  {} - {}", source, local.format("%m-%d %H:%M:%S"))?;
            }
            Ok(())
        }
    }
}
