//! Conversation domain model.

use crate::ids::{ConversationId, ProvisionalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a conversation is created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "新对话";

/// A conversation as known to the client.
///
/// `id` is provisional while the conversation only exists locally and is
/// promoted once the server has issued its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u32,
}

impl Conversation {
    /// Synthesizes a local conversation for a first message sent without a
    /// selection. The title is derived from the message content.
    pub fn provisional(first_message: &str, title_max_chars: usize, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::Provisional(ProvisionalId::generate(now)),
            title: provisional_title(first_message, title_max_chars),
            created_at: now,
            updated_at: now,
            message_count: 0,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }

    /// Applies the counters of a confirmed send.
    pub fn record_exchange(&mut self, added_messages: u32, at: DateTime<Utc>) {
        self.message_count = self.message_count.saturating_add(added_messages);
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

/// Truncates `content` to `max_chars` characters, appending `...` when cut.
pub fn provisional_title(content: &str, max_chars: usize) -> String {
    let content = content.trim();
    if content.chars().count() > max_chars {
        let head: String = content.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}
