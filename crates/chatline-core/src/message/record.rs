//! Raw message records as delivered by the remote service.
//!
//! The server declares a `type` and attaches loosely-typed `metadata`. Turning
//! a record into a [`Message`] normalises the metadata so that every message
//! handed to a renderer is well-formed for its type.

use super::model::{Message, MessageKind, MessageRole};
use super::payload::{KnowledgeSources, MessagePayload, WeatherReport};
use crate::error::{ChatError, Result};
use crate::ids::{ConversationId, MessageId, ServerId};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message exactly as the remote service returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub role: MessageRole,
    pub timestamp: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl MessageRecord {
    /// Validates and normalises the record.
    ///
    /// - `TEXT`: metadata is ignored.
    /// - `WEATHER`: requires `metadata.weather`; without it the message is
    ///   downgraded to `TEXT`.
    /// - `KNOWLEDGE`: missing sources default to empty, missing confidence to
    ///   `0`, and confidence is clamped to `[0, 1]`.
    ///
    /// Fails only when the timestamp cannot be parsed.
    pub fn into_message(self) -> Result<Message> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let metadata = self.metadata.and_then(unwrap_json_scalar);

        let payload = match self.kind {
            MessageKind::Text => MessagePayload::Text,
            MessageKind::Weather => match weather_from(metadata.as_ref()) {
                Some(report) => MessagePayload::Weather(report),
                None => {
                    tracing::warn!(
                        "[MessageRecord] WEATHER message {} has no weather record, rendering as TEXT",
                        self.id
                    );
                    MessagePayload::Text
                }
            },
            MessageKind::Knowledge => MessagePayload::Knowledge(knowledge_from(metadata.as_ref())),
        };

        Ok(Message {
            id: MessageId::new(self.id),
            conversation_id: ConversationId::Confirmed(ServerId::new(self.conversation_id)),
            content: self.content,
            role: self.role,
            timestamp,
            payload,
        })
    }
}

/// Parses a server timestamp: RFC 3339, or unix milliseconds as a string.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(millis) = raw.parse::<i64>() {
        if let Some(parsed) = Utc.timestamp_millis_opt(millis).single() {
            return Ok(parsed);
        }
    }
    Err(ChatError::Serialization {
        format: "timestamp".to_string(),
        message: format!("unrecognised timestamp '{raw}'"),
    })
}

// GraphQL JSON scalars are sometimes delivered as an encoded string.
fn unwrap_json_scalar(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(encoded) => serde_json::from_str(&encoded).ok(),
        other => Some(other),
    }
}

fn weather_from(metadata: Option<&Value>) -> Option<WeatherReport> {
    let weather = metadata?.get("weather")?;
    serde_json::from_value(weather.clone()).ok()
}

fn knowledge_from(metadata: Option<&Value>) -> KnowledgeSources {
    let sources = metadata
        .and_then(|m| m.get("sources"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let confidence = metadata
        .and_then(|m| m.get("confidence"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    KnowledgeSources::new(sources, confidence)
}
