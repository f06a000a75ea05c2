//! Optimistic overlay: user sends that the server has not confirmed yet.

use chatline_core::ids::{ConversationId, LocalId, MessageId};
use chatline_core::message::Message;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A locally echoed send. Lives for exactly one send operation.
#[derive(Debug, Clone)]
pub struct OptimisticEntry {
    pub local_id: LocalId,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
    pub status: OptimisticStatus,
    /// Confirmed user messages with the same content that predate this send.
    earlier_echoes: HashSet<MessageId>,
}

impl OptimisticEntry {
    pub(crate) fn pending(content: &str, submitted_at: DateTime<Utc>, confirmed: &[Message]) -> Self {
        let earlier_echoes = confirmed
            .iter()
            .filter(|m| m.is_user() && m.content == content)
            .map(|m| m.id.clone())
            .collect();
        Self {
            local_id: LocalId::generate(),
            content: content.to_string(),
            submitted_at,
            status: OptimisticStatus::Pending,
            earlier_echoes,
        }
    }

    /// True when `confirmed` already holds the server's copy of this send,
    /// e.g. a poll landed after the server stored it but before the send
    /// response arrived.
    pub(crate) fn is_echoed_in(&self, confirmed: &[Message]) -> bool {
        confirmed.iter().any(|m| {
            m.is_user() && m.content == self.content && !self.earlier_echoes.contains(&m.id)
        })
    }

    pub(crate) fn to_message(&self, conversation_id: ConversationId) -> Message {
        Message::pending_user(&self.local_id, conversation_id, self.content.clone(), self.submitted_at)
    }
}

/// Pending entries in submission order.
#[derive(Debug, Default)]
pub(crate) struct Overlay {
    entries: Vec<OptimisticEntry>,
}

impl Overlay {
    pub(crate) fn push(&mut self, entry: OptimisticEntry) {
        self.entries.push(entry);
    }

    /// Marks an entry with its final status and removes it. Returns `None`
    /// if the entry was already discarded.
    pub(crate) fn settle(&mut self, local_id: &LocalId, status: OptimisticStatus) -> Option<OptimisticEntry> {
        let index = self.entries.iter().position(|e| &e.local_id == local_id)?;
        let mut entry = self.entries.remove(index);
        entry.status = status;
        Some(entry)
    }

    pub(crate) fn pending(&self) -> impl Iterator<Item = &OptimisticEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == OptimisticStatus::Pending)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::ids::ServerId;
    use chatline_core::message::{MessagePayload, MessageRole};

    fn confirmed_user(id: &str, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            conversation_id: ConversationId::Confirmed(ServerId::new("c1")),
            content: content.to_string(),
            role: MessageRole::User,
            timestamp: Utc::now(),
            payload: MessagePayload::Text,
        }
    }

    #[test]
    fn test_repeated_content_is_not_mistaken_for_an_echo() {
        let history = vec![confirmed_user("u0", "hi")];
        let entry = OptimisticEntry::pending("hi", Utc::now(), &history);
        assert!(!entry.is_echoed_in(&history));

        let mut after = history.clone();
        after.push(confirmed_user("u1", "hi"));
        assert!(entry.is_echoed_in(&after));
    }

    #[test]
    fn test_settle_removes_entry_with_final_status() {
        let mut overlay = Overlay::default();
        let entry = OptimisticEntry::pending("hello", Utc::now(), &[]);
        let local_id = entry.local_id.clone();
        overlay.push(entry);
        assert_eq!(overlay.pending().count(), 1);

        let settled = overlay.settle(&local_id, OptimisticStatus::Failed).unwrap();
        assert_eq!(settled.status, OptimisticStatus::Failed);
        assert!(overlay.is_empty());
        assert!(overlay.settle(&local_id, OptimisticStatus::Confirmed).is_none());
    }
}
