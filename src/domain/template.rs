//! Notification rendering: `{placeholder}` substitution and outbound message assembly.

use crate::domain::entities::ContentSegment;
use crate::domain::items::{Fields, Observable};
use crate::domain::rules::{RuleTemplate, WatchRule};
use serde::{Deserialize, Serialize};

/// Final outbound content, ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub segments: Vec<ContentSegment>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![ContentSegment::text(text)],
        }
    }

    /// Flattened text, used for logging and for transports without rich content.
    pub fn preview(&self) -> String {
        self.segments.iter().map(ContentSegment::preview_text).collect()
    }
}

/// Replace each `{name}` whose name is in `fields`; leave every other token as written.
///
/// Single left-to-right pass: substituted values are never scanned again.
pub fn render(template: &str, fields: &Fields) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            is_placeholder_name(name)
                .then(|| fields.get(name))
                .flatten()
                .map(|value| (value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Build the message a matched rule sends for `item`.
///
/// Per-kind templates render the whole message. A prefix template renders a leading text
/// segment (omitted when empty), followed by either the original content segments
/// unchanged or the item's plain text.
pub fn render_notification(rule: &WatchRule, item: &dyn Observable) -> OutboundMessage {
    let fields = item.fields();
    match &rule.template {
        RuleTemplate::PerKind(templates) => match templates.for_kind(item.kind()) {
            Some(template) => OutboundMessage::text(render(template, &fields)),
            None => OutboundMessage::text(item.match_text()),
        },
        RuleTemplate::Prefix(prefix) => {
            let mut segments = Vec::new();
            let prefix = render(prefix, &fields);
            if !prefix.is_empty() {
                segments.push(ContentSegment::text(prefix));
            }
            if rule.preserve_original_content {
                segments.extend(item.content());
            } else {
                segments.push(ContentSegment::text(item.match_text()));
            }
            OutboundMessage { segments }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ChatMessage, MediaReference, MediaType};
    use crate::domain::items::{EventKind, Release, SourceKey};
    use crate::domain::rules::{DispatchTarget, EventTemplates, Filter};

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_fields() {
        let f = fields(&[("repo", "X"), ("author", "bob"), ("message", "fix")]);
        assert_eq!(render("[{repo}] {author}: {message}", &f), "[X] bob: fix");
    }

    #[test]
    fn unknown_placeholder_is_left_literal() {
        let f = fields(&[("repo", "X")]);
        assert_eq!(render("{repo} {missing}", &f), "X {missing}");
    }

    #[test]
    fn values_are_not_substituted_again() {
        let f = fields(&[("message", "{author}"), ("author", "bob")]);
        assert_eq!(render("{message}", &f), "{author}");
    }

    #[test]
    fn stray_braces_survive() {
        let f = fields(&[("a", "1")]);
        assert_eq!(render("{ {a} } {", &f), "{ 1 } {");
        assert_eq!(render("{{a}}", &f), "{1}");
    }

    fn photo_message() -> ChatMessage {
        ChatMessage {
            id: 5,
            chat_id: -10,
            sender_id: Some(42),
            outgoing: false,
            segments: vec![
                ContentSegment::text("look "),
                ContentSegment::Media {
                    media: MediaReference {
                        message_id: 5,
                        chat_id: -10,
                        media_type: MediaType::Photo,
                    },
                    caption: "at this".into(),
                },
            ],
        }
    }

    fn forward_rule(prefix: &str, preserve: bool) -> WatchRule {
        WatchRule {
            name: "fwd".into(),
            enabled: true,
            sources: [SourceKey::chat(-10)].into_iter().collect(),
            destinations: vec![DispatchTarget::room(-20)],
            filters: vec![Filter::Keywords(vec!["look".into()])],
            template: RuleTemplate::Prefix(prefix.into()),
            preserve_original_content: preserve,
        }
    }

    #[test]
    fn preserving_forward_prepends_prefix_to_original_segments() {
        let msg = photo_message();
        let out = render_notification(&forward_rule("[from {sourceGroup} by {senderUin}] ", true), &msg);
        assert_eq!(out.segments[0], ContentSegment::text("[from -10 by 42] "));
        assert_eq!(&out.segments[1..], msg.segments.as_slice());
    }

    #[test]
    fn plain_forward_sends_extracted_text() {
        let out = render_notification(&forward_rule("", false), &photo_message());
        assert_eq!(out, OutboundMessage::text("look [Photo] at this"));
    }

    #[test]
    fn per_kind_template_renders_release() {
        let rule = WatchRule {
            name: "octo/repo".into(),
            enabled: true,
            sources: [SourceKey::repo("octo", "repo")].into_iter().collect(),
            destinations: vec![DispatchTarget::room(1)],
            filters: vec![Filter::EventKinds(vec![EventKind::Releases])],
            template: RuleTemplate::PerKind(EventTemplates {
                new_commit: String::new(),
                new_issue: String::new(),
                new_release: "{repo} {version}: {title} {url}".into(),
            }),
            preserve_original_content: false,
        };
        let release = Release {
            repo: "Repo".into(),
            tag: "v1".into(),
            name: "First".into(),
            author: "amy".into(),
            url: "https://x/r/v1".into(),
        };
        assert_eq!(
            render_notification(&rule, &release).preview(),
            "Repo v1: First https://x/r/v1"
        );
    }
}
