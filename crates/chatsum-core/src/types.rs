use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic id of the implicit "general" partition every forum carries.
///
/// The general topic has no dedicated history of its own; its messages live
/// in the whole-conversation history and are distinguished by the absence of
/// a cross-topic reply reference.
pub const GENERAL_TOPIC_ID: i32 = 1;

/// Snapshot of a conversation as returned by the dialog listing.
///
/// Immutable once fetched; the unread counter may be zeroed locally after a
/// mark-as-read without re-listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub is_channel: bool,
    #[serde(default)]
    pub is_forum: bool,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub is_bot: bool,
    /// Highest message id the user has acknowledged reading.
    #[serde(default)]
    pub last_read_id: i32,
    /// Id of the newest message in the conversation.
    #[serde(default)]
    pub top_message_id: i32,
}

/// A sub-conversation inside a forum chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i32,
    pub title: String,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_read_id: i32,
    #[serde(default)]
    pub top_message_id: i32,
}

/// One historical message.
///
/// Ids are assigned by the service and strictly increase within a
/// conversation, which makes them usable both as the pagination cursor and
/// as the read watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i32,
    pub date: DateTime<Utc>,
    pub text: String,
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// True for messages the user sent themselves.
    #[serde(default)]
    pub outgoing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Whether this message can ever appear in an export. Empty bodies and
    /// outgoing messages are ineligible in every fetch mode.
    pub fn is_eligible(&self) -> bool {
        !self.text.is_empty() && !self.outgoing
    }
}

/// Reference to the message this one replies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub message_id: i32,
    /// Id of the forum topic the referenced thread belongs to, 0 when the
    /// reply is not topic-scoped.
    #[serde(default)]
    pub top_id: i32,
    #[serde(default)]
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Aggregated reaction count on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub count: u32,
}

/// Normalize a user-supplied chat id.
///
/// Channel ids are often written in the `-100`-prefixed form used by bot
/// APIs; accept both that and the raw positive id.
pub fn normalize_chat_id(raw: i64) -> i64 {
    const CHANNEL_PREFIX: i64 = -1_000_000_000_000;
    if raw < CHANNEL_PREFIX {
        -(raw - CHANNEL_PREFIX)
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(text: &str, outgoing: bool) -> Message {
        Message {
            id: 1,
            date: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            text: text.to_string(),
            sender_id: 7,
            sender_name: None,
            outgoing,
            reply_to: None,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn eligibility_requires_text_and_incoming() {
        assert!(message("hello", false).is_eligible());
        assert!(!message("", false).is_eligible());
        assert!(!message("hello", true).is_eligible());
    }

    #[test]
    fn normalize_chat_id_strips_channel_prefix() {
        assert_eq!(normalize_chat_id(-1001234567890), 1234567890);
        assert_eq!(normalize_chat_id(1234567890), 1234567890);
        // ordinary negative group ids are left alone
        assert_eq!(normalize_chat_id(-4567), -4567);
    }
}
