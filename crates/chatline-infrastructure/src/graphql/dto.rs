//! Wire shapes of the GraphQL requests and responses.

use chatline_core::conversation::Conversation;
use chatline_core::error::Result;
use chatline_core::ids::{ConversationId, ServerId};
use chatline_core::lookup::KnowledgeItem;
use chatline_core::message::{Message, MessageKind, MessageRecord, WeatherReport, parse_timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a, V> {
    pub query: &'a str,
    #[serde(rename = "operationName")]
    pub operation_name: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    pub path: Option<Vec<serde_json::Value>>,
}

impl GraphqlError {
    /// `message (at a.b.0)` when the server reported a path.
    pub fn describe(&self) -> String {
        let Some(path) = self.path.as_ref().filter(|path| !path.is_empty()) else {
            return self.message.clone();
        };
        let path: Vec<String> = path
            .iter()
            .map(|segment| match segment {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("{} (at {})", self.message, path.join("."))
    }
}

/// A conversation exactly as the server returned it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub message_count: u32,
}

impl ConversationRecord {
    pub fn into_conversation(self) -> Result<Conversation> {
        Ok(Conversation {
            id: ConversationId::Confirmed(ServerId::new(self.id)),
            title: self.title,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            message_count: self.message_count,
        })
    }
}

/// Converts records, dropping the ones that cannot be read.
pub fn convert_all<R, T, F>(records: Vec<R>, entity: &str, convert: F) -> Vec<T>
where
    F: Fn(R) -> Result<T>,
{
    records
        .into_iter()
        .filter_map(|record| match convert(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("[GraphqlChatApi] Skipping unreadable {}: {}", entity, e);
                None
            }
        })
        .collect()
}

// Variables

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationIdVars<'a> {
    pub conversation_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct IdVars<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TitleVars<'a> {
    pub title: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CityVars<'a> {
    pub city: &'a str,
}

#[derive(Debug, Serialize)]
pub struct QueryVars<'a> {
    pub query: &'a str,
}

#[derive(Debug, Serialize)]
pub struct InputVars<T> {
    pub input: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput<'a> {
    pub conversation_id: &'a str,
    pub content: &'a str,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

// Response data

#[derive(Debug, Deserialize)]
pub struct ConversationsData {
    pub conversations: Vec<ConversationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesData {
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageData {
    pub send_message: SendMessagePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub user_message: MessageRecord,
    pub bot_message: MessageRecord,
}

impl SendMessagePayload {
    pub fn into_messages(self) -> Result<(Message, Message)> {
        Ok((self.user_message.into_message()?, self.bot_message.into_message()?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationData {
    pub create_conversation: ConversationRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConversationData {
    pub delete_conversation: bool,
}

#[derive(Debug, Deserialize)]
pub struct WeatherData {
    pub weather: WeatherReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchKnowledgeData {
    pub search_knowledge: Vec<KnowledgeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKnowledgeData {
    pub add_knowledge: KnowledgeItem,
}
