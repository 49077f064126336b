//! Watch rules: what to watch, how to filter it and where to send it.
//!
//! Rules are built once from configuration and never mutated afterwards.

use crate::domain::items::{EventKind, SourceKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Delivery channel of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Group / channel broadcast.
    Room,
    /// Direct message to a single user.
    Direct,
}

/// Destination address plus channel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DispatchTarget {
    pub chat_id: i64,
    pub kind: ChannelKind,
}

impl DispatchTarget {
    pub fn room(chat_id: i64) -> Self {
        Self {
            chat_id,
            kind: ChannelKind::Room,
        }
    }

    pub fn direct(chat_id: i64) -> Self {
        Self {
            chat_id,
            kind: ChannelKind::Direct,
        }
    }

    /// Address in source-key form, for comparison against the item's origin.
    pub fn address(&self) -> SourceKey {
        SourceKey::chat(self.chat_id)
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChannelKind::Room => write!(f, "room:{}", self.chat_id),
            ChannelKind::Direct => write!(f, "dm:{}", self.chat_id),
        }
    }
}

/// One match predicate kind. Items within a kind are OR-ed; kinds are OR-ed with each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Text starts with any of these (case-insensitive).
    Prefixes(Vec<String>),
    /// Text contains any of these (case-insensitive).
    Keywords(Vec<String>),
    /// Item's event kind is one of these.
    EventKinds(Vec<EventKind>),
}

/// Per-event-kind message templates for repository notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplates {
    pub new_commit: String,
    pub new_issue: String,
    pub new_release: String,
}

impl EventTemplates {
    pub fn for_kind(&self, kind: EventKind) -> Option<&str> {
        match kind {
            EventKind::Commits => Some(&self.new_commit),
            EventKind::Issues => Some(&self.new_issue),
            EventKind::Releases => Some(&self.new_release),
            EventKind::Messages => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTemplate {
    /// Leading text for chat forwards (`{sourceGroup}`, `{senderUin}`).
    Prefix(String),
    /// Full message per event kind (`{repo}`, `{author}`, `{message}`, ...).
    PerKind(EventTemplates),
}

/// One forwarding / notification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRule {
    pub name: String,
    pub enabled: bool,
    pub sources: BTreeSet<SourceKey>,
    pub destinations: Vec<DispatchTarget>,
    pub filters: Vec<Filter>,
    pub template: RuleTemplate,
    /// Copy the original content segments instead of only its plain text.
    pub preserve_original_content: bool,
}

impl WatchRule {
    fn filter_summary(&self) -> Vec<String> {
        self.filters
            .iter()
            .filter_map(|f| match f {
                Filter::Prefixes(p) if !p.is_empty() => Some(format!("prefixes: {}", p.join(", "))),
                Filter::Keywords(k) if !k.is_empty() => Some(format!("keywords: {}", k.join(", "))),
                Filter::EventKinds(e) if !e.is_empty() => Some(format!(
                    "events: {}",
                    e.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                )),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for WatchRule {
    /// Multi-line listing used by the status view.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.enabled { "on" } else { "off" };
        writeln!(f, "[{}] {}", status, self.name)?;
        let sources: Vec<&str> = self.sources.iter().map(SourceKey::as_str).collect();
        writeln!(f, "   sources: {}", sources.join(", "))?;
        let targets: Vec<String> = self.destinations.iter().map(ToString::to_string).collect();
        writeln!(f, "   destinations: {}", targets.join(", "))?;
        for line in self.filter_summary() {
            writeln!(f, "   {}", line)?;
        }
        write!(
            f,
            "   preserve original content: {}",
            if self.preserve_original_content { "yes" } else { "no" }
        )
    }
}

/// Poll parameters for one watched repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoWatch {
    pub owner: String,
    pub name: String,
    /// Label used for `{repo}` in notifications.
    pub display_name: String,
    pub events: Vec<EventKind>,
}

impl RepoWatch {
    pub fn source_key(&self) -> SourceKey {
        SourceKey::repo(&self.owner, &self.name)
    }

    pub fn watches(&self, kind: EventKind) -> bool {
        self.events.contains(&kind)
    }
}

/// Numbered listing of all rules, or a notice when none are configured.
pub fn describe_rules(rules: &[WatchRule]) -> String {
    if rules.is_empty() {
        return "No rules configured".to_string();
    }
    rules
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_shows_filters_and_targets() {
        let rule = WatchRule {
            name: "alerts".into(),
            enabled: true,
            sources: [SourceKey::chat(-1)].into_iter().collect(),
            destinations: vec![DispatchTarget::room(-2), DispatchTarget::direct(5)],
            filters: vec![
                Filter::Prefixes(vec!["!".into()]),
                Filter::Keywords(vec![]),
            ],
            template: RuleTemplate::Prefix(String::new()),
            preserve_original_content: false,
        };
        let listing = describe_rules(&[rule]);
        assert!(listing.starts_with("1. [on] alerts"));
        assert!(listing.contains("destinations: room:-2, dm:5"));
        assert!(listing.contains("prefixes: !"));
        assert!(!listing.contains("keywords"));
        assert!(listing.ends_with("preserve original content: no"));
    }

    #[test]
    fn target_address_matches_chat_source_key() {
        assert_eq!(DispatchTarget::room(-100).address(), SourceKey::chat(-100));
    }
}
