//! Candidate items: the observed units that flow through the notification pipeline.
//!
//! Every concrete item kind implements [`Observable`], which is all the pipeline needs:
//! a dedup identity, an event kind for kind-level filters, text for prefix/keyword
//! filters, placeholder fields for templates and the original content for forwards.

use crate::domain::entities::{ChatMessage, ContentSegment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder name -> value, used for template expansion.
pub type Fields = BTreeMap<String, String>;

/// Identifier of one watched origin: `owner/repo` or a chat id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn repo(owner: &str, name: &str) -> Self {
        Self(format!("{}/{}", owner, name))
    }

    pub fn chat(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of observed event. Repository watches select a subset of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Commits,
    Issues,
    Releases,
    Messages,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Commits => "commits",
            EventKind::Issues => "issues",
            EventKind::Releases => "releases",
            EventKind::Messages => "messages",
        })
    }
}

/// Shared capability of every candidate item.
pub trait Observable {
    /// Dedup key, unique within one source-key.
    fn identity(&self) -> String;

    fn kind(&self) -> EventKind;

    /// Text that prefix and keyword filters run against.
    fn match_text(&self) -> String;

    /// Values for template placeholders.
    fn fields(&self) -> Fields;

    /// Original content, for content-preserving forwards.
    fn content(&self) -> Vec<ContentSegment> {
        vec![ContentSegment::text(self.match_text())]
    }
}

/// A commit on the watched repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Display label of the repository.
    pub repo: String,
    pub sha: String,
    pub author: String,
    pub message: String,
    pub url: String,
}

impl Commit {
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

impl Observable for Commit {
    fn identity(&self) -> String {
        self.sha.clone()
    }

    fn kind(&self) -> EventKind {
        EventKind::Commits
    }

    fn match_text(&self) -> String {
        self.headline().to_string()
    }

    fn fields(&self) -> Fields {
        fields([
            ("repo", self.repo.clone()),
            ("author", self.author.clone()),
            ("message", self.headline().to_string()),
            ("url", self.url.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub state: String,
    pub url: String,
}

impl Observable for Issue {
    fn identity(&self) -> String {
        format!("issue-{}", self.number)
    }

    fn kind(&self) -> EventKind {
        EventKind::Issues
    }

    fn match_text(&self) -> String {
        self.title.clone()
    }

    fn fields(&self) -> Fields {
        fields([
            ("repo", self.repo.clone()),
            ("author", self.author.clone()),
            ("title", self.title.clone()),
            ("state", self.state.clone()),
            ("url", self.url.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub repo: String,
    pub tag: String,
    /// Release display name; empty when the release was published without one.
    pub name: String,
    pub author: String,
    pub url: String,
}

impl Release {
    pub fn title(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.tag
        } else {
            &self.name
        }
    }
}

impl Observable for Release {
    fn identity(&self) -> String {
        format!("release-{}", self.tag)
    }

    fn kind(&self) -> EventKind {
        EventKind::Releases
    }

    fn match_text(&self) -> String {
        self.title().to_string()
    }

    fn fields(&self) -> Fields {
        fields([
            ("repo", self.repo.clone()),
            ("author", self.author.clone()),
            ("version", self.tag.clone()),
            ("title", self.title().to_string()),
            ("url", self.url.clone()),
        ])
    }
}

impl Observable for ChatMessage {
    fn identity(&self) -> String {
        format!("msg-{}", self.id)
    }

    fn kind(&self) -> EventKind {
        EventKind::Messages
    }

    fn match_text(&self) -> String {
        self.plain_text()
    }

    fn fields(&self) -> Fields {
        fields([
            ("sourceGroup", self.chat_id.to_string()),
            (
                "senderUin",
                self.sender_id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            ("message", self.plain_text()),
        ])
    }

    fn content(&self) -> Vec<ContentSegment> {
        self.segments.clone()
    }
}

/// Tagged union of everything a source adapter can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateItem {
    Commit(Commit),
    Issue(Issue),
    Release(Release),
    ChatMessage(ChatMessage),
}

impl CandidateItem {
    fn observable(&self) -> &dyn Observable {
        match self {
            CandidateItem::Commit(c) => c,
            CandidateItem::Issue(i) => i,
            CandidateItem::Release(r) => r,
            CandidateItem::ChatMessage(m) => m,
        }
    }
}

impl Observable for CandidateItem {
    fn identity(&self) -> String {
        self.observable().identity()
    }

    fn kind(&self) -> EventKind {
        self.observable().kind()
    }

    fn match_text(&self) -> String {
        self.observable().match_text()
    }

    fn fields(&self) -> Fields {
        self.observable().fields()
    }

    fn content(&self) -> Vec<ContentSegment> {
        self.observable().content()
    }
}

fn fields<const N: usize>(pairs: [(&str, String); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
