//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram or IO types here. Adapters map into these.

use serde::{Deserialize, Serialize};

/// Represents a Telegram chat (user, group, or channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    User,
    Group,
    Channel,
}

/// Outcome of submitting a login code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResult {
    Success,
    /// Account has 2FA enabled; a password must be checked next.
    PasswordRequired { hint: Option<String> },
}

/// An inbound chat message, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i32,
    pub chat_id: i64,
    pub sender_id: Option<i64>,
    /// True when the message was sent by this account.
    pub outgoing: bool,
    /// Ordered content, as it appeared in the original message.
    pub segments: Vec<ContentSegment>,
}

impl ChatMessage {
    /// Plain-text rendition: every segment's preview text, concatenated in order.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(ContentSegment::preview_text).collect()
    }
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentSegment {
    Text { text: String },
    /// Media attachment of an existing message. The caption travels with the media.
    Media {
        media: MediaReference,
        caption: String,
    },
}

impl ContentSegment {
    pub fn text(text: impl Into<String>) -> Self {
        ContentSegment::Text { text: text.into() }
    }

    /// Text shown when the content is flattened, e.g. `[Photo] look at this`.
    pub fn preview_text(&self) -> String {
        match self {
            ContentSegment::Text { text } => text.clone(),
            ContentSegment::Media { media, caption } if caption.is_empty() => {
                format!("[{}]", media.media_type.label())
            }
            ContentSegment::Media { media, caption } => {
                format!("[{}] {}", media.media_type.label(), caption)
            }
        }
    }
}

/// Reference to media inside an existing message. The transport resolves it when forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub message_id: i32,
    pub chat_id: i64,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
    Document,
    Audio,
    Sticker,
    Other,
}

impl MediaType {
    pub fn label(self) -> &'static str {
        match self {
            MediaType::Photo => "Photo",
            MediaType::Video => "Video",
            MediaType::Document => "Document",
            MediaType::Audio => "Audio",
            MediaType::Sticker => "Sticker",
            MediaType::Other => "Media",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_joins_preview_of_every_segment() {
        let msg = ChatMessage {
            id: 7,
            chat_id: -100,
            sender_id: Some(42),
            outgoing: false,
            segments: vec![
                ContentSegment::text("see: "),
                ContentSegment::Media {
                    media: MediaReference {
                        message_id: 7,
                        chat_id: -100,
                        media_type: MediaType::Photo,
                    },
                    caption: "diagram".into(),
                },
            ],
        };
        assert_eq!(msg.plain_text(), "see: [Photo] diagram");
    }

    #[test]
    fn media_without_caption_previews_as_label() {
        let seg = ContentSegment::Media {
            media: MediaReference {
                message_id: 1,
                chat_id: 1,
                media_type: MediaType::Sticker,
            },
            caption: String::new(),
        };
        assert_eq!(seg.preview_text(), "[Sticker]");
    }
}
