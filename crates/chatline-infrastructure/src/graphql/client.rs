//! HTTP client for the assistant's GraphQL endpoint.

use super::dto::*;
use super::queries;
use async_trait::async_trait;
use chatline_core::api::ChatApi;
use chatline_core::config::ClientConfig;
use chatline_core::conversation::Conversation;
use chatline_core::error::{ChatError, Result};
use chatline_core::ids::{ConversationId, ServerId};
use chatline_core::lookup::{AddKnowledgeInput, KnowledgeItem, LookupApi};
use chatline_core::message::{Message, MessageKind, MessageRecord, SendReply, WeatherReport};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// [`ChatApi`] and [`LookupApi`] over GraphQL-on-HTTP.
///
/// Connection failures, timeouts, non-success statuses and unreadable
/// bodies surface as `ChatError::Transport`; a non-empty `errors` array as
/// `ChatError::Application`.
#[derive(Clone)]
pub struct GraphqlChatApi {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphqlChatApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ChatError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<V, T>(&self, operation: &str, query: &str, variables: V) -> Result<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        tracing::debug!("[GraphqlChatApi] {} -> {}", operation, self.endpoint);
        let request = GraphqlRequest {
            query,
            operation_name: operation,
            variables,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(operation, e))?;

        decode_response(operation, status, &body)
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> ChatError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("cannot connect ({})", err)
    } else {
        err.to_string()
    };
    tracing::warn!("[GraphqlChatApi] {} failed: {}", operation, reason);
    ChatError::transport(format!("{}: {}", operation, reason))
}

/// Turns an HTTP answer into the operation's data.
///
/// Servers commonly answer GraphQL errors with a 4xx/5xx status and a
/// regular error body, so the body is inspected before the status.
pub(crate) fn decode_response<T: DeserializeOwned>(
    operation: &str,
    status: StatusCode,
    body: &str,
) -> Result<T> {
    let parsed = serde_json::from_str::<GraphqlResponse<T>>(body);

    if let Ok(GraphqlResponse {
        errors: Some(errors),
        ..
    }) = &parsed
    {
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(GraphqlError::describe).collect();
            tracing::warn!(
                "[GraphqlChatApi] {} returned errors: {}",
                operation,
                messages.join("; ")
            );
            return Err(ChatError::application(messages));
        }
    }

    if !status.is_success() {
        return Err(ChatError::transport(format!(
            "{}: HTTP {}",
            operation, status
        )));
    }

    match parsed {
        Ok(GraphqlResponse {
            data: Some(data), ..
        }) => Ok(data),
        Ok(_) => Err(ChatError::application([format!(
            "{} returned no data",
            operation
        )])),
        Err(e) => Err(ChatError::transport(format!(
            "{}: malformed response ({})",
            operation, e
        ))),
    }
}

#[async_trait]
impl ChatApi for GraphqlChatApi {
    async fn fetch_messages(&self, conversation_id: &ServerId) -> Result<Vec<Message>> {
        let data: MessagesData = self
            .execute(
                "GetMessages",
                &queries::get_messages(),
                ConversationIdVars {
                    conversation_id: conversation_id.as_str(),
                },
            )
            .await?;
        Ok(convert_all(
            data.messages,
            "message",
            MessageRecord::into_message,
        ))
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        let data: ConversationsData = self
            .execute(
                "GetConversations",
                queries::GET_CONVERSATIONS,
                serde_json::Map::new(),
            )
            .await?;
        Ok(convert_all(
            data.conversations,
            "conversation",
            ConversationRecord::into_conversation,
        ))
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        kind: MessageKind,
    ) -> Result<SendReply> {
        let data: SendMessageData = self
            .execute(
                "SendMessage",
                &queries::send_message(),
                InputVars {
                    input: SendMessageInput {
                        conversation_id: conversation_id.as_str(),
                        content,
                        kind,
                    },
                },
            )
            .await?;
        let (user_message, bot_message) = data.send_message.into_messages()?;
        Ok(SendReply {
            user_message,
            bot_message,
        })
    }

    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        let data: CreateConversationData = self
            .execute(
                "CreateConversation",
                queries::CREATE_CONVERSATION,
                TitleVars { title },
            )
            .await?;
        data.create_conversation.into_conversation()
    }

    async fn delete_conversation(&self, conversation_id: &ServerId) -> Result<bool> {
        let data: DeleteConversationData = self
            .execute(
                "DeleteConversation",
                queries::DELETE_CONVERSATION,
                IdVars {
                    id: conversation_id.as_str(),
                },
            )
            .await?;
        Ok(data.delete_conversation)
    }
}

#[async_trait]
impl LookupApi for GraphqlChatApi {
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReport> {
        let data: WeatherData = self
            .execute("GetWeather", queries::GET_WEATHER, CityVars { city })
            .await?;
        Ok(data.weather)
    }

    async fn search_knowledge(&self, query: &str) -> Result<Vec<KnowledgeItem>> {
        let data: SearchKnowledgeData = self
            .execute(
                "SearchKnowledge",
                queries::SEARCH_KNOWLEDGE,
                QueryVars { query },
            )
            .await?;
        Ok(data.search_knowledge)
    }

    async fn add_knowledge(&self, input: AddKnowledgeInput) -> Result<KnowledgeItem> {
        let data: AddKnowledgeData = self
            .execute("AddKnowledge", queries::ADD_KNOWLEDGE, InputVars { input })
            .await?;
        Ok(data.add_knowledge)
    }
}
