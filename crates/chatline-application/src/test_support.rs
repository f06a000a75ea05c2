//! In-memory collaborators for the application tests.

use async_trait::async_trait;
use chatline_core::api::ChatApi;
use chatline_core::conversation::Conversation;
use chatline_core::error::{ChatError, Result};
use chatline_core::ids::{ConversationId, MessageId, ServerId};
use chatline_core::message::{
    KnowledgeSources, Message, MessageKind, MessagePayload, MessageRole, SendReply, WeatherReport,
};
use chatline_core::settings::Settings;
use chatline_core::state::{AppState, StateRepository};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

#[derive(Default)]
pub(crate) struct MockStateRepository {
    pub(crate) state: Mutex<AppState>,
}

#[async_trait]
impl StateRepository for MockStateRepository {
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

/// Blocks a mocked request until the test releases it.
///
/// `entered` is signalled when a request reaches the gate, so a test can wait
/// for the request to be in flight before acting.
pub(crate) struct Gate {
    pub(crate) entered: Notify,
    permits: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            permits: Semaphore::new(0),
        }
    }
}

impl Gate {
    pub(crate) fn release(&self) {
        self.permits.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Reply shape the mock backend produces for the next send.
#[derive(Clone)]
pub(crate) enum BotReply {
    Text,
    Weather(WeatherReport),
    Knowledge(KnowledgeSources),
}

/// A fake chat backend that stores what it is sent.
pub(crate) struct MockChatApi {
    clock: Mutex<DateTime<Utc>>,
    next_id: Mutex<u64>,
    pub(crate) conversations: Mutex<Vec<Conversation>>,
    pub(crate) messages: Mutex<HashMap<String, Vec<Message>>>,
    pub(crate) fail_next_send: Mutex<Option<ChatError>>,
    pub(crate) fail_fetches: Mutex<bool>,
    pub(crate) bot_reply: Mutex<BotReply>,
    pub(crate) send_gate: Mutex<Option<Arc<Gate>>>,
    pub(crate) fetch_gate: Mutex<Option<Arc<Gate>>>,
    pub(crate) list_gate: Mutex<Option<Arc<Gate>>>,
    pub(crate) sent: Mutex<Vec<(String, String)>>,
    pub(crate) fetched: Mutex<Vec<String>>,
    pub(crate) deleted: Mutex<Vec<String>>,
}

impl Default for MockChatApi {
    fn default() -> Self {
        Self {
            clock: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
            next_id: Mutex::new(0),
            conversations: Mutex::new(Vec::new()),
            messages: Mutex::new(HashMap::new()),
            fail_next_send: Mutex::new(None),
            fail_fetches: Mutex::new(false),
            bot_reply: Mutex::new(BotReply::Text),
            send_gate: Mutex::new(None),
            fetch_gate: Mutex::new(None),
            list_gate: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

impl MockChatApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn gate_sends(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.send_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn gate_fetches(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.fetch_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Gates `fetch_conversations` after it has read the list.
    pub(crate) fn gate_conversation_fetches(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn ungate(&self) {
        *self.send_gate.lock().unwrap() = None;
        *self.fetch_gate.lock().unwrap() = None;
        *self.list_gate.lock().unwrap() = None;
    }

    fn tick(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::seconds(1);
        *clock
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("{prefix}{next}")
    }

    /// Seeds a server-side conversation.
    pub(crate) fn seed_conversation(&self, id: &str, title: &str) -> Conversation {
        let now = self.tick();
        let conversation = Conversation {
            id: ConversationId::Confirmed(ServerId::new(id)),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        };
        self.conversations.lock().unwrap().push(conversation.clone());
        conversation
    }

    /// Seeds a server-side message, as if another client had sent it.
    pub(crate) fn seed_message(&self, conversation: &str, content: &str, role: MessageRole) -> Message {
        let message = Message {
            id: MessageId::new(self.next_id("m")),
            conversation_id: ConversationId::Confirmed(ServerId::new(conversation)),
            content: content.to_string(),
            role,
            timestamp: self.tick(),
            payload: MessagePayload::Text,
        };
        self.messages
            .lock()
            .unwrap()
            .entry(conversation.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    pub(crate) fn stored_messages(&self, conversation: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .get(conversation)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn fetch_messages(&self, conversation_id: &ServerId) -> Result<Vec<Message>> {
        self.fetched
            .lock()
            .unwrap()
            .push(conversation_id.as_str().to_string());
        let snapshot = self.stored_messages(conversation_id.as_str());
        let gate = self.fetch_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if *self.fail_fetches.lock().unwrap() {
            return Err(ChatError::transport("connection refused"));
        }
        Ok(snapshot)
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        if *self.fail_fetches.lock().unwrap() {
            return Err(ChatError::transport("connection refused"));
        }
        let listed = self.conversations.lock().unwrap().clone();
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(listed)
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        _kind: MessageKind,
    ) -> Result<SendReply> {
        self.sent
            .lock()
            .unwrap()
            .push((conversation_id.as_str().to_string(), content.to_string()));

        // Provisional ids get a server id of their own.
        let stored_under = if conversation_id.is_provisional() {
            let id = self.next_id("srv-");
            self.seed_conversation(&id, content);
            id
        } else {
            conversation_id.as_str().to_string()
        };

        let user_message = self.seed_message(&stored_under, content, MessageRole::User);

        let gate = self.send_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if let Some(err) = self.fail_next_send.lock().unwrap().take() {
            self.messages
                .lock()
                .unwrap()
                .entry(stored_under)
                .or_default()
                .retain(|m| m.id != user_message.id);
            return Err(err);
        }

        let mut bot_message = self.seed_message(&stored_under, "reply", MessageRole::Assistant);
        bot_message.payload = match self.bot_reply.lock().unwrap().clone() {
            BotReply::Text => MessagePayload::Text,
            BotReply::Weather(report) => MessagePayload::Weather(report),
            BotReply::Knowledge(sources) => MessagePayload::Knowledge(sources),
        };
        if let Some(stored) = self
            .messages
            .lock()
            .unwrap()
            .get_mut(&stored_under)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == bot_message.id))
        {
            *stored = bot_message.clone();
        }

        Ok(SendReply {
            user_message,
            bot_message,
        })
    }

    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        let id = self.next_id("srv-");
        Ok(self.seed_conversation(&id, title.unwrap_or_default()))
    }

    async fn delete_conversation(&self, conversation_id: &ServerId) -> Result<bool> {
        self.deleted
            .lock()
            .unwrap()
            .push(conversation_id.as_str().to_string());
        let mut conversations = self.conversations.lock().unwrap();
        let before = conversations.len();
        conversations.retain(|c| c.id.as_str() != conversation_id.as_str());
        Ok(conversations.len() != before)
    }
}
