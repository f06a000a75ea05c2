//! Server-confirmed message set for one conversation.

use chatline_core::ids::Promotion;
use chatline_core::message::Message;
use std::collections::HashSet;

/// Confirmed messages, kept ordered by timestamp. Equal timestamps keep the
/// order in which the server returned them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    messages: Vec<Message>,
    /// Incremented whenever a send result is folded in. A poll issued at an
    /// older revision may be missing those messages.
    revision: u64,
}

impl Snapshot {
    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the whole set with a poll result.
    pub(crate) fn replace(&mut self, polled: Vec<Message>) {
        self.messages = polled;
        self.sort();
    }

    /// Unions a poll result with what is already known, by id. Polled
    /// messages win; known messages the poll did not carry are kept.
    pub(crate) fn merge(&mut self, polled: Vec<Message>) {
        let polled_ids: HashSet<_> = polled.iter().map(|m| m.id.clone()).collect();
        let kept: Vec<Message> = self
            .messages
            .drain(..)
            .filter(|m| !polled_ids.contains(&m.id))
            .collect();
        self.messages = polled;
        self.messages.extend(kept);
        self.sort();
    }

    /// Applies a poll result issued at `issued_at` revision.
    pub(crate) fn apply_poll(&mut self, polled: Vec<Message>, issued_at: u64) {
        if issued_at == self.revision {
            self.replace(polled);
        } else {
            self.merge(polled);
        }
    }

    /// Folds confirmed messages from a send result, replacing any message
    /// with the same id.
    pub(crate) fn fold(&mut self, confirmed: impl IntoIterator<Item = Message>) {
        for message in confirmed {
            match self.messages.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message,
                None => self.messages.push(message),
            }
        }
        self.sort();
        self.revision += 1;
    }

    pub(crate) fn promote(&mut self, promotion: &Promotion) {
        for message in &mut self.messages {
            message.conversation_id = message.conversation_id.promoted(promotion);
        }
    }

    /// Drops everything. The revision keeps counting so stale polls stay
    /// detectable.
    pub(crate) fn reset(&mut self) {
        self.messages.clear();
        self.revision += 1;
    }

    fn sort(&mut self) {
        self.messages.sort_by_key(|m| m.timestamp);
    }
}
