//! Map grammers types to domain entities, and outbound messages to transport calls.

use crate::domain::{
    Chat, ChatMessage, ChatType, ContentSegment, MediaReference, MediaType, OutboundMessage,
};
use grammers_client::types::{self, Media};

/// Map a grammers chat to domain ChatType.
pub fn chat_type(chat: &types::Chat) -> ChatType {
    match chat {
        types::Chat::User(_) => ChatType::User,
        types::Chat::Group(_) => ChatType::Group,
        types::Chat::Channel(_) => ChatType::Channel,
    }
}

pub fn chat_to_domain(chat: &types::Chat) -> Chat {
    let title = match chat.name() {
        "" => chat.id().to_string(),
        name => name.to_string(),
    };
    Chat {
        id: chat.id(),
        title,
        username: chat.username().map(String::from),
        chat_type: chat_type(chat),
    }
}

/// Map an incoming grammers message to a domain ChatMessage.
pub fn message_to_domain(msg: &types::Message) -> ChatMessage {
    let chat_id = msg.chat().id();
    ChatMessage {
        id: msg.id(),
        chat_id,
        sender_id: msg.sender().map(|s| s.id()),
        outgoing: msg.outgoing(),
        segments: segments(msg.id(), chat_id, msg.text(), msg.media().map(|m| media_type(&m))),
    }
}

pub fn media_type(media: &Media) -> MediaType {
    match media {
        Media::Photo(_) => MediaType::Photo,
        Media::Sticker(_) => MediaType::Sticker,
        Media::Document(d) => media_type_from_mime(d.mime_type()),
        _ => MediaType::Other,
    }
}

pub fn media_type_from_mime(mime: Option<&str>) -> MediaType {
    match mime {
        Some(m) if m.starts_with("video/") => MediaType::Video,
        Some(m) if m.starts_with("audio/") => MediaType::Audio,
        Some("application/x-tgsticker") => MediaType::Sticker,
        _ => MediaType::Document,
    }
}

/// Telegram carries at most one attachment per message, with the text as its caption.
pub fn segments(
    message_id: i32,
    chat_id: i64,
    text: &str,
    media: Option<MediaType>,
) -> Vec<ContentSegment> {
    match media {
        Some(media_type) => vec![ContentSegment::Media {
            media: MediaReference {
                message_id,
                chat_id,
                media_type,
            },
            caption: text.to_string(),
        }],
        None if text.is_empty() => Vec::new(),
        None => vec![ContentSegment::text(text)],
    }
}

/// One transport call needed to deliver an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStep {
    Text(String),
    /// Forward an existing message (media together with its caption).
    Forward { chat_id: i64, message_id: i32 },
}

/// Chats that forward steps read from, each once, in plan order. The transport resolves all of
/// them before the first call so an unknown source fails the delivery before the prefix is posted.
pub fn forward_sources(plan: &[DeliveryStep]) -> Vec<i64> {
    let mut sources = Vec::new();
    for step in plan {
        if let DeliveryStep::Forward { chat_id, .. } = step {
            if !sources.contains(chat_id) {
                sources.push(*chat_id);
            }
        }
    }
    sources
}

/// Turn segments into transport calls, in order. Adjacent text is merged into one message.
/// Telegram has no call that posts a prefix and forwards in one request, so a prefixed media
/// message takes two calls; a failure on the forward is reported with the prefix already sent.
pub fn delivery_plan(message: &OutboundMessage) -> Vec<DeliveryStep> {
    let mut steps = Vec::new();
    let mut text = String::new();
    for segment in &message.segments {
        match segment {
            ContentSegment::Text { text: t } => text.push_str(t),
            ContentSegment::Media { media, .. } => {
                if !text.trim().is_empty() {
                    steps.push(DeliveryStep::Text(std::mem::take(&mut text)));
                }
                text.clear();
                steps.push(DeliveryStep::Forward {
                    chat_id: media.chat_id,
                    message_id: media.message_id,
                });
            }
        }
    }
    if !text.trim().is_empty() {
        steps.push(DeliveryStep::Text(text));
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(chat_id: i64, message_id: i32, caption: &str) -> ContentSegment {
        ContentSegment::Media {
            media: MediaReference {
                message_id,
                chat_id,
                media_type: MediaType::Photo,
            },
            caption: caption.into(),
        }
    }

    #[test]
    fn mime_types_map_to_media_kinds() {
        assert_eq!(media_type_from_mime(Some("video/mp4")), MediaType::Video);
        assert_eq!(media_type_from_mime(Some("audio/ogg")), MediaType::Audio);
        assert_eq!(
            media_type_from_mime(Some("application/x-tgsticker")),
            MediaType::Sticker
        );
        assert_eq!(media_type_from_mime(Some("application/pdf")), MediaType::Document);
        assert_eq!(media_type_from_mime(None), MediaType::Document);
    }

    #[test]
    fn captioned_media_becomes_single_media_segment() {
        let segs = segments(9, -5, "look", Some(MediaType::Photo));
        assert_eq!(segs, vec![photo(-5, 9, "look")]);
        assert!(segments(9, -5, "", None).is_empty());
    }

    #[test]
    fn plan_sends_prefix_then_forwards_media() {
        let message = OutboundMessage {
            segments: vec![ContentSegment::text("[Forwarded from -5] "), photo(-5, 9, "look")],
        };
        assert_eq!(
            delivery_plan(&message),
            vec![
                DeliveryStep::Text("[Forwarded from -5] ".into()),
                DeliveryStep::Forward {
                    chat_id: -5,
                    message_id: 9
                },
            ]
        );
    }

    #[test]
    fn plan_merges_adjacent_text() {
        let message = OutboundMessage {
            segments: vec![ContentSegment::text("a "), ContentSegment::text("b")],
        };
        assert_eq!(delivery_plan(&message), vec![DeliveryStep::Text("a b".into())]);
    }

    #[test]
    fn forward_sources_are_listed_once_in_plan_order() {
        let message = OutboundMessage {
            segments: vec![
                ContentSegment::text("p "),
                photo(-5, 9, ""),
                photo(-7, 1, ""),
                photo(-5, 10, ""),
            ],
        };
        assert_eq!(forward_sources(&delivery_plan(&message)), vec![-5, -7]);
        assert!(forward_sources(&[DeliveryStep::Text("x".into())]).is_empty());
    }
}
