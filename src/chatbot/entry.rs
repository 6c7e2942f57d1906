//! Transcript entries: one recorded unit of conversation.

use serde::{Deserialize, Serialize};

/// `sender_id` used for everything the bot itself produced.
pub const BOT_SENDER_ID: i64 = 0;

/// What an entry's payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Text,
    /// Payload is a file URL with the bot token masked.
    Photo,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Text => "text",
            EntryKind::Photo => "photo",
        }
    }

    /// Inverse of [`EntryKind::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(EntryKind::Text),
            "photo" => Some(EntryKind::Photo),
            _ => None,
        }
    }
}

/// A single inbound or outbound unit of a user's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub payload: String,
    /// The human participant who owns the conversation.
    pub user_id: i64,
    /// Who produced this unit: `user_id` for inbound, [`BOT_SENDER_ID`] for bot output.
    pub sender_id: i64,
    pub kind: EntryKind,
    /// Position within a batch write. `None` means insertion order governs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

impl TranscriptEntry {
    /// Text written by the human.
    pub fn from_user(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            payload: text.into(),
            user_id,
            sender_id: user_id,
            kind: EntryKind::Text,
            order: None,
        }
    }

    /// Photo sent by the human. `masked_url` must already be redacted.
    pub fn photo_from_user(user_id: i64, masked_url: impl Into<String>) -> Self {
        Self {
            payload: masked_url.into(),
            user_id,
            sender_id: user_id,
            kind: EntryKind::Photo,
            order: None,
        }
    }

    /// Text generated by the bot in `user_id`'s conversation.
    pub fn from_bot(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            payload: text.into(),
            user_id,
            sender_id: BOT_SENDER_ID,
            kind: EntryKind::Text,
            order: None,
        }
    }
}
