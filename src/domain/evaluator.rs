//! Rule evaluation: which rules does a candidate item satisfy, and where does each send it.

use crate::domain::items::{Observable, SourceKey};
use crate::domain::rules::{DispatchTarget, Filter, WatchRule};
use tracing::debug;

/// A rule that matched, with its destinations after loop-avoidance.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'r> {
    pub rule: &'r WatchRule,
    pub destinations: Vec<DispatchTarget>,
}

/// Match `item` (observed on `source`) against every rule.
///
/// Rules are independent: the same item may match several rules and each match yields its
/// own delivery. A destination equal to the item's source is never returned, and a rule
/// left with no destinations does not match.
pub fn evaluate<'r>(
    item: &dyn Observable,
    source: &SourceKey,
    rules: &'r [WatchRule],
) -> Vec<Match<'r>> {
    rules
        .iter()
        .filter(|rule| rule.enabled && rule.sources.contains(source))
        .filter(|rule| filters_match(&rule.filters, item))
        .filter_map(|rule| {
            let destinations: Vec<DispatchTarget> = rule
                .destinations
                .iter()
                .filter(|target| {
                    let looped = target.address() == *source;
                    if looped {
                        debug!(rule = %rule.name, %source, "skipping forward back into source");
                    }
                    !looped
                })
                .copied()
                .collect();
            (!destinations.is_empty()).then_some(Match { rule, destinations })
        })
        .collect()
}

/// OR across filter kinds and across entries within a kind. No filters never matches.
fn filters_match(filters: &[Filter], item: &dyn Observable) -> bool {
    let text = item.match_text().to_lowercase();
    filters.iter().any(|filter| match filter {
        Filter::Prefixes(prefixes) => prefixes
            .iter()
            .any(|p| text.starts_with(&p.to_lowercase())),
        Filter::Keywords(keywords) => keywords
            .iter()
            .any(|k| text.contains(&k.to_lowercase())),
        Filter::EventKinds(kinds) => kinds.contains(&item.kind()),
    })
}
