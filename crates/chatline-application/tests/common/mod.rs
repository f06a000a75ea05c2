//! A scripted in-memory backend for driving `ChatClient` end to end.

use async_trait::async_trait;
use chatline_core::api::ChatApi;
use chatline_core::conversation::Conversation;
use chatline_core::error::{ChatError, Result};
use chatline_core::ids::{ConversationId, MessageId, ServerId};
use chatline_core::message::{
    KnowledgeSources, Message, MessageKind, MessagePayload, MessageRole, SendReply,
};
use chatline_core::settings::Settings;
use chatline_core::state::{AppState, StateRepository};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct ServerState {
    clock: i64,
    next_id: u64,
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
}

impl ServerState {
    fn now(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::seconds(self.clock)
    }

    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn store(&mut self, conversation: &str, content: &str, role: MessageRole) -> Message {
        let message = Message {
            id: MessageId::new(self.id("msg-")),
            conversation_id: ConversationId::Confirmed(ServerId::new(conversation)),
            content: content.to_string(),
            role,
            timestamp: self.now(),
            payload: MessagePayload::Text,
        };
        self.messages
            .entry(conversation.to_string())
            .or_default()
            .push(message.clone());
        if let Some(c) = self
            .conversations
            .iter_mut()
            .find(|c| c.id.as_str() == conversation)
        {
            c.message_count += 1;
            c.updated_at = message.timestamp;
        }
        message
    }

    fn create(&mut self, title: &str) -> Conversation {
        let now = self.now();
        let conversation = Conversation {
            id: ConversationId::Confirmed(ServerId::new(self.id("conv-srv-"))),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        };
        self.conversations.push(conversation.clone());
        conversation
    }
}

/// Answers questions mentioning "knowledge" with a knowledge payload and
/// everything else with plain text.
#[derive(Default)]
pub struct FakeServer {
    state: Mutex<ServerState>,
    pub send_calls: Mutex<usize>,
    pub delete_calls: Mutex<usize>,
    pub fetch_calls: Mutex<Vec<String>>,
    pub offline: Mutex<bool>,
}

impl FakeServer {
    /// Stores a message as if another client had posted it.
    pub fn post_from_elsewhere(&self, conversation: &str, content: &str) -> Message {
        self.state
            .lock()
            .unwrap()
            .store(conversation, content, MessageRole::User)
    }

    pub fn create_directly(&self, title: &str) -> Conversation {
        self.state.lock().unwrap().create(title)
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().unwrap().conversations.len()
    }

    fn check_online(&self) -> Result<()> {
        if *self.offline.lock().unwrap() {
            Err(ChatError::transport("network unreachable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatApi for FakeServer {
    async fn fetch_messages(&self, conversation_id: &ServerId) -> Result<Vec<Message>> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push(conversation_id.as_str().to_string());
        self.check_online()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .get(conversation_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        self.check_online()?;
        Ok(self.state.lock().unwrap().conversations.clone())
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        _kind: MessageKind,
    ) -> Result<SendReply> {
        *self.send_calls.lock().unwrap() += 1;
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        let target = match conversation_id {
            ConversationId::Provisional(_) => state.create(content).id.as_str().to_string(),
            ConversationId::Confirmed(id) => id.as_str().to_string(),
        };
        let user_message = state.store(&target, content, MessageRole::User);
        let mut bot_message = state.store(&target, &format!("echo: {content}"), MessageRole::Assistant);
        if content.contains("knowledge") {
            bot_message.payload = MessagePayload::Knowledge(KnowledgeSources::new(
                vec!["handbook.md".to_string()],
                0.92,
            ));
            if let Some(stored) = state
                .messages
                .get_mut(&target)
                .and_then(|messages| messages.last_mut())
            {
                *stored = bot_message.clone();
            }
        }
        Ok(SendReply {
            user_message,
            bot_message,
        })
    }

    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        self.check_online()?;
        Ok(self.state.lock().unwrap().create(title.unwrap_or_default()))
    }

    async fn delete_conversation(&self, conversation_id: &ServerId) -> Result<bool> {
        *self.delete_calls.lock().unwrap() += 1;
        self.check_online()?;
        let mut state = self.state.lock().unwrap();
        let before = state.conversations.len();
        state
            .conversations
            .retain(|c| c.id.as_str() != conversation_id.as_str());
        state.messages.remove(conversation_id.as_str());
        Ok(state.conversations.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryState {
    state: Mutex<AppState>,
}

#[async_trait]
impl StateRepository for MemoryState {
    async fn save_state(&self, state: AppState) -> Result<()> {
        *self.state.lock().unwrap() = state;
        Ok(())
    }

    async fn get_state(&self) -> Result<AppState> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn get_current_conversation(&self) -> Option<Conversation> {
        self.state.lock().unwrap().current_conversation.clone()
    }

    async fn set_current_conversation(&self, conversation: Conversation) -> Result<()> {
        self.state.lock().unwrap().current_conversation = Some(conversation);
        Ok(())
    }

    async fn clear_current_conversation(&self) -> Result<()> {
        self.state.lock().unwrap().current_conversation = None;
        Ok(())
    }

    async fn get_settings(&self) -> Settings {
        self.state.lock().unwrap().settings.clone()
    }

    async fn set_settings(&self, settings: Settings) -> Result<()> {
        self.state.lock().unwrap().settings = settings;
        Ok(())
    }
}
