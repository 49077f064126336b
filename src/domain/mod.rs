//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here: candidate items, watch rules, rule evaluation
//! and template rendering. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod evaluator;
pub mod items;
pub mod rules;
pub mod template;

pub use entities::{
    Chat, ChatMessage, ChatType, ContentSegment, MediaReference, MediaType,
    SignInResult,
};
pub use errors::DomainError;
pub use evaluator::{Match, evaluate};
pub use items::{CandidateItem, Commit, EventKind, Fields, Issue, Observable, Release, SourceKey};
pub use rules::{
    ChannelKind, DispatchTarget, EventTemplates, Filter, RepoWatch, RuleTemplate, WatchRule,
    describe_rules,
};
pub use template::{OutboundMessage, render, render_notification};
