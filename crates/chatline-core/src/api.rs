//! Remote service contract consumed by the synchronization core.
//!
//! Implementations normalise every record they return (see
//! [`MessageRecord::into_message`](crate::message::MessageRecord::into_message)),
//! so callers only ever see well-formed messages. Failures are reported as
//! [`ChatError::Transport`](crate::error::ChatError::Transport) or
//! [`ChatError::Application`](crate::error::ChatError::Application).

use async_trait::async_trait;

use crate::conversation::Conversation;
use crate::error::Result;
use crate::ids::{ConversationId, ServerId};
use crate::message::{Message, MessageKind, SendReply};

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Messages of a conversation in server order.
    async fn fetch_messages(&self, conversation_id: &ServerId) -> Result<Vec<Message>>;

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>>;

    /// Sends `content` to a conversation. A provisional id is passed through
    /// verbatim; the server answers with the id it actually stored under in
    /// `user_message.conversation_id`.
    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        kind: MessageKind,
    ) -> Result<SendReply>;

    async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation>;

    /// Returns whether the server still had the conversation.
    async fn delete_conversation(&self, conversation_id: &ServerId) -> Result<bool>;
}
