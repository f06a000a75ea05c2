//! Session selector: the single "current conversation" pointer.
//!
//! The pointer is published through a `watch` channel. Each genuine switch
//! increments `switch_seq`; in-place updates of the selected conversation
//! (id promotion, refreshed counters) keep the sequence number, so observers
//! can tell a switch from an update.

use chatline_core::conversation::Conversation;
use chatline_core::error::Result;
use chatline_core::ids::{ConversationId, Promotion};
use chatline_core::state::StateRepository;
use std::sync::Arc;
use tokio::sync::watch;

/// The published selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub conversation: Option<Conversation>,
    pub switch_seq: u64,
}

impl Selection {
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation.as_ref().map(|conversation| &conversation.id)
    }
}

pub struct SessionSelector {
    tx: watch::Sender<Selection>,
    state_repository: Arc<dyn StateRepository>,
}

impl SessionSelector {
    pub fn new(state_repository: Arc<dyn StateRepository>) -> Self {
        let (tx, _rx) = watch::channel(Selection::default());
        Self {
            tx,
            state_repository,
        }
    }

    /// Restores the persisted selection. Performs no network activity.
    pub async fn restore(&self) -> Option<Conversation> {
        let restored = self.state_repository.get_current_conversation().await;
        if let Some(conversation) = &restored {
            tracing::info!(
                "[SessionSelector] Restored selection: {} ({})",
                conversation.id,
                conversation.title
            );
            self.swap(Some(conversation.clone()));
        }
        restored
    }

    pub fn current(&self) -> Option<Conversation> {
        self.tx.borrow().conversation.clone()
    }

    pub fn current_id(&self) -> Option<ConversationId> {
        self.tx.borrow().conversation_id().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.tx.subscribe()
    }

    /// Points the selection at `conversation` (or clears it) and persists it.
    ///
    /// The in-memory swap always happens; an error only means the selection
    /// could not be persisted.
    pub async fn select(&self, conversation: Option<Conversation>) -> Result<()> {
        self.swap(conversation.clone());
        match conversation {
            Some(conversation) => {
                self.state_repository
                    .set_current_conversation(conversation)
                    .await
            }
            None => self.state_repository.clear_current_conversation().await,
        }
    }

    /// Clears the selection if it currently points at `id`.
    ///
    /// Returns whether the selection was cleared.
    pub async fn clear_if_current(&self, id: &ConversationId) -> Result<bool> {
        if self.current_id().as_ref() != Some(id) {
            return Ok(false);
        }
        self.select(None).await?;
        Ok(true)
    }

    /// Rewrites a provisional selection to its confirmed id without counting
    /// it as a switch.
    pub async fn promote(&self, promotion: &Promotion) -> Result<bool> {
        let promoted = self.tx.send_if_modified(|selection| {
            match selection.conversation.as_mut() {
                Some(conversation) if conversation.id.as_provisional() == Some(&promotion.provisional) => {
                    conversation.id = conversation.id.promoted(promotion);
                    true
                }
                _ => false,
            }
        });
        if promoted {
            tracing::debug!(
                "[SessionSelector] Promoted selection {} -> {}",
                promotion.provisional,
                promotion.confirmed
            );
            self.persist_current().await?;
        }
        Ok(promoted)
    }

    /// Replaces the stored copy of the selected conversation (e.g. refreshed
    /// counters) when `conversation` is the one selected. Not a switch.
    pub async fn refresh_current(&self, conversation: &Conversation) -> Result<bool> {
        let refreshed = self.tx.send_if_modified(|selection| {
            match selection.conversation.as_mut() {
                Some(current) if current.id == conversation.id && current != conversation => {
                    *current = conversation.clone();
                    true
                }
                _ => false,
            }
        });
        if refreshed {
            self.persist_current().await?;
        }
        Ok(refreshed)
    }

    fn swap(&self, conversation: Option<Conversation>) {
        self.tx.send_modify(|selection| {
            let switching = selection.conversation_id() != conversation.as_ref().map(|c| &c.id);
            if switching {
                selection.switch_seq += 1;
                tracing::debug!(
                    "[SessionSelector] Switched to {:?} (seq {})",
                    conversation.as_ref().map(|c| c.id.as_str()),
                    selection.switch_seq
                );
            }
            selection.conversation = conversation;
        });
    }

    async fn persist_current(&self) -> Result<()> {
        match self.current() {
            Some(conversation) => {
                self.state_repository
                    .set_current_conversation(conversation)
                    .await
            }
            None => self.state_repository.clear_current_conversation().await,
        }
    }
}
