//! Conversation message types.

use super::payload::{KnowledgeSources, MessagePayload, WeatherReport};
use crate::ids::{ConversationId, LocalId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Declared type of a message as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Text,
    Weather,
    Knowledge,
}

impl MessageKind {
    /// Wire name (`TEXT`, `WEATHER`, `KNOWLEDGE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Weather => "WEATHER",
            Self::Knowledge => "KNOWLEDGE",
        }
    }

    /// Short display label shown next to assistant messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "文本",
            Self::Weather => "天气",
            Self::Knowledge => "知识",
        }
    }
}

/// A single, well-formed message.
///
/// The payload variant always matches the declared type, so consumers never
/// need to check for missing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
    pub payload: MessagePayload,
}

impl Message {
    /// Builds the renderer-facing form of a not-yet-confirmed user message.
    pub fn pending_user(
        local_id: &LocalId,
        conversation_id: ConversationId,
        content: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(local_id.as_str()),
            conversation_id,
            content: content.into(),
            role: MessageRole::User,
            timestamp: submitted_at,
            payload: MessagePayload::Text,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self.payload {
            MessagePayload::Text => MessageKind::Text,
            MessagePayload::Weather(_) => MessageKind::Weather,
            MessagePayload::Knowledge(_) => MessageKind::Knowledge,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn weather(&self) -> Option<&WeatherReport> {
        match &self.payload {
            MessagePayload::Weather(report) => Some(report),
            _ => None,
        }
    }

    pub fn knowledge(&self) -> Option<&KnowledgeSources> {
        match &self.payload {
            MessagePayload::Knowledge(sources) => Some(sources),
            _ => None,
        }
    }
}

/// Result of a confirmed send: the stored user message and the assistant's
/// answer, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReply {
    pub user_message: Message,
    pub bot_message: Message,
}
