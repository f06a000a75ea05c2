//! Message synchronizer.
//!
//! Owns the visible message sequence of the selected conversation: the last
//! confirmed snapshot plus an optimistic overlay of unconfirmed sends.
//!
//! Every poll and send carries the epoch it was issued under. The epoch moves
//! forward on each conversation switch observed from the [`SessionSelector`],
//! and a result whose epoch no longer matches is dropped unapplied. There is
//! no network cancellation, only result suppression.
//!
//! The state lock is never held across a network call.

use super::overlay::{OptimisticEntry, OptimisticStatus, Overlay};
use super::snapshot::Snapshot;
use super::view::{Delivery, Notice, SyncPhase, SyncView, VisibleMessage};
use crate::directory::ConversationDirectory;
use crate::selector::{Selection, SessionSelector};
use chatline_core::api::ChatApi;
use chatline_core::conversation::Conversation;
use chatline_core::error::ChatError;
use chatline_core::ids::{ConversationId, LocalId, Promotion};
use chatline_core::message::{MessageKind, SendReply};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, MutexGuard, Notify, watch};

/// How a `send` call ended.
#[derive(Debug)]
pub enum SendOutcome {
    /// The server stored the message and answered.
    Confirmed(SendReply),
    /// Refused locally, nothing was sent. Never shown to the user.
    Rejected(ChatError),
    /// The request failed; a notice has been raised.
    Failed(ChatError),
    /// The selection changed while the request was in flight; its result
    /// was discarded.
    Superseded,
}

impl SendOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// How a poll ended.
#[derive(Debug)]
pub enum PollOutcome {
    Applied { messages: usize },
    /// Nothing to poll: no selection, or a provisional conversation.
    Skipped,
    /// Stale epoch.
    Discarded,
    /// The snapshot was kept as it was.
    Failed(ChatError),
}

struct SyncInner {
    selection: watch::Receiver<Selection>,
    switch_seq: u64,
    epoch: u64,
    conversation: Option<ConversationId>,
    phase: SyncPhase,
    snapshot: Snapshot,
    overlay: Overlay,
    notice: Option<Notice>,
}

impl SyncInner {
    /// Applies a selection switch, if one happened since the last look.
    fn observe_selection(&mut self) -> bool {
        if !self.selection.has_changed().unwrap_or(false) {
            return false;
        }
        let selection = self.selection.borrow_and_update().clone();
        if selection.switch_seq == self.switch_seq {
            return false;
        }
        self.switch_seq = selection.switch_seq;
        self.switch_to(selection.conversation.map(|c| c.id));
        true
    }

    fn switch_to(&mut self, next: Option<ConversationId>) {
        self.epoch += 1;
        self.overlay.clear();
        self.snapshot.reset();
        self.notice = None;
        // A provisional conversation has nothing on the server to wait for.
        self.phase = match &next {
            Some(ConversationId::Provisional(_)) => SyncPhase::Synced,
            _ => SyncPhase::Idle,
        };
        tracing::debug!(
            "[MessageSynchronizer] Epoch {}: now on {:?}",
            self.epoch,
            next.as_ref().map(ConversationId::as_str)
        );
        self.conversation = next;
    }

    fn view(&self) -> SyncView {
        let confirmed = self.snapshot.messages();
        let mut messages: Vec<VisibleMessage> = confirmed
            .iter()
            .cloned()
            .map(|message| VisibleMessage {
                message,
                delivery: Delivery::Confirmed,
            })
            .collect();

        if let Some(conversation) = &self.conversation {
            messages.extend(
                self.overlay
                    .pending()
                    .filter(|entry| !entry.is_echoed_in(confirmed))
                    .map(|entry| VisibleMessage {
                        message: entry.to_message(conversation.clone()),
                        delivery: Delivery::Pending,
                    }),
            );
        }

        SyncView {
            phase: self.phase,
            conversation: self.conversation.clone(),
            epoch: self.epoch,
            messages,
            notice: self.notice.clone(),
            awaiting_reply: self.phase == SyncPhase::Sending,
        }
    }
}

struct PreparedSend {
    epoch: u64,
    conversation: ConversationId,
    local_id: LocalId,
}

pub struct MessageSynchronizer {
    api: Arc<dyn ChatApi>,
    selector: Arc<SessionSelector>,
    directory: Arc<ConversationDirectory>,
    title_max_chars: usize,
    inner: Mutex<SyncInner>,
    /// Held while a send is being set up, so two sends from an empty
    /// selection cannot both synthesize a conversation.
    send_gate: Mutex<()>,
    view_tx: watch::Sender<SyncView>,
    refresh: Notify,
}

impl MessageSynchronizer {
    pub fn new(
        api: Arc<dyn ChatApi>,
        selector: Arc<SessionSelector>,
        directory: Arc<ConversationDirectory>,
        title_max_chars: usize,
    ) -> Self {
        let mut selection = selector.subscribe();
        let initial = selection.borrow_and_update().clone();
        let mut inner = SyncInner {
            selection,
            switch_seq: initial.switch_seq,
            epoch: 0,
            conversation: None,
            phase: SyncPhase::Idle,
            snapshot: Snapshot::default(),
            overlay: Overlay::default(),
            notice: None,
        };
        if let Some(conversation) = initial.conversation {
            inner.switch_to(Some(conversation.id));
        }
        let (view_tx, _rx) = watch::channel(inner.view());

        Self {
            api,
            selector,
            directory,
            title_max_chars,
            inner: Mutex::new(inner),
            send_gate: Mutex::new(()),
            view_tx,
            refresh: Notify::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> SyncView {
        self.view_tx.borrow().clone()
    }

    /// Resolves when a refresh has been requested, e.g. after a send.
    pub fn refresh_requested(&self) -> Notified<'_> {
        self.refresh.notified()
    }

    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Picks up a selection change right away instead of at the next poll.
    pub async fn sync_selection(&self) {
        let _inner = self.lock_observed().await;
    }

    /// Sends `content` to the current conversation.
    ///
    /// Blank content and a send while another is in flight are rejected
    /// without a network call. With no selection, a provisional conversation
    /// titled after the message is created and selected first. The message is
    /// visible as pending before the request is issued.
    pub async fn send(&self, content: &str) -> SendOutcome {
        let content = content.trim();
        if content.is_empty() {
            return SendOutcome::Rejected(ChatError::validation("message is empty"));
        }

        let Ok(gate) = self.send_gate.try_lock() else {
            return SendOutcome::Rejected(ChatError::validation("a send is already in flight"));
        };
        let prepared = match self.prepare_send(content).await {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };
        drop(gate);

        tracing::debug!(
            "[MessageSynchronizer] Sending to {} (epoch {})",
            prepared.conversation,
            prepared.epoch
        );
        let result = self
            .api
            .send_message(&prepared.conversation, content, MessageKind::Text)
            .await;
        self.settle_send(prepared, result).await
    }

    /// Fetches the current conversation's messages once.
    pub async fn poll_once(&self) -> PollOutcome {
        let (epoch, server_id, issued_at) = {
            let inner = self.lock_observed().await;
            match &inner.conversation {
                Some(ConversationId::Confirmed(id)) => {
                    (inner.epoch, id.clone(), inner.snapshot.revision())
                }
                Some(ConversationId::Provisional(_)) | None => return PollOutcome::Skipped,
            }
        };

        let result = self.api.fetch_messages(&server_id).await;

        let mut inner = self.lock_observed().await;
        if inner.epoch != epoch {
            tracing::debug!(
                "[MessageSynchronizer] Discarding poll of {} from epoch {} (now {})",
                server_id,
                epoch,
                inner.epoch
            );
            return PollOutcome::Discarded;
        }
        match result {
            Ok(messages) => {
                let count = messages.len();
                inner.snapshot.apply_poll(messages, issued_at);
                if inner.phase == SyncPhase::Idle {
                    inner.phase = SyncPhase::Synced;
                }
                self.publish(&inner);
                PollOutcome::Applied { messages: count }
            }
            Err(err) => {
                tracing::warn!("[MessageSynchronizer] Poll of {} failed: {}", server_id, err);
                PollOutcome::Failed(err)
            }
        }
    }

    /// Dismisses the failure notice.
    pub async fn dismiss_notice(&self) {
        let mut inner = self.lock_observed().await;
        if inner.notice.take().is_some() {
            self.publish(&inner);
        }
    }

    async fn lock_observed(&self) -> MutexGuard<'_, SyncInner> {
        let mut inner = self.inner.lock().await;
        if inner.observe_selection() {
            self.publish(&inner);
        }
        inner
    }

    fn publish(&self, inner: &SyncInner) {
        self.view_tx.send_replace(inner.view());
    }

    async fn prepare_send(&self, content: &str) -> Result<PreparedSend, SendOutcome> {
        {
            let mut inner = self.lock_observed().await;
            if inner.phase == SyncPhase::Sending {
                return Err(SendOutcome::Rejected(ChatError::validation(
                    "a send is already in flight",
                )));
            }
            if let Some(conversation) = inner.conversation.clone() {
                return Ok(self.begin_send(&mut inner, conversation, content));
            }
        }

        let conversation = Conversation::provisional(content, self.title_max_chars, Utc::now());
        tracing::info!(
            "[MessageSynchronizer] No conversation selected, starting provisional {}",
            conversation.id
        );
        self.directory.insert_provisional(conversation.clone()).await;
        if let Err(e) = self.selector.select(Some(conversation.clone())).await {
            tracing::warn!("[MessageSynchronizer] Failed to persist selection: {}", e);
        }

        let mut inner = self.lock_observed().await;
        if inner.conversation.as_ref() != Some(&conversation.id) {
            return Err(SendOutcome::Superseded);
        }
        if inner.phase == SyncPhase::Sending {
            return Err(SendOutcome::Rejected(ChatError::validation(
                "a send is already in flight",
            )));
        }
        Ok(self.begin_send(&mut inner, conversation.id, content))
    }

    fn begin_send(
        &self,
        inner: &mut SyncInner,
        conversation: ConversationId,
        content: &str,
    ) -> PreparedSend {
        let entry = OptimisticEntry::pending(content, Utc::now(), inner.snapshot.messages());
        let prepared = PreparedSend {
            epoch: inner.epoch,
            conversation,
            local_id: entry.local_id.clone(),
        };
        inner.overlay.push(entry);
        inner.phase = SyncPhase::Sending;
        inner.notice = None;
        self.publish(inner);
        prepared
    }

    async fn settle_send(
        &self,
        prepared: PreparedSend,
        result: chatline_core::Result<SendReply>,
    ) -> SendOutcome {
        let promotion = match (&prepared.conversation, &result) {
            (ConversationId::Provisional(provisional), Ok(reply)) => {
                match &reply.user_message.conversation_id {
                    ConversationId::Confirmed(confirmed) => {
                        Some(provisional.clone().promote(confirmed.clone()))
                    }
                    ConversationId::Provisional(_) => None,
                }
            }
            _ => None,
        };

        let mut inner = self.lock_observed().await;
        if inner.epoch != prepared.epoch {
            tracing::debug!(
                "[MessageSynchronizer] Discarding send result for {} from epoch {} (now {})",
                prepared.conversation,
                prepared.epoch,
                inner.epoch
            );
            let Some(promotion) = promotion else {
                return SendOutcome::Superseded;
            };
            // The server created the conversation anyway; its id must still
            // replace the provisional one everywhere.
            let reselected = inner
                .conversation
                .as_ref()
                .and_then(ConversationId::as_provisional)
                == Some(&promotion.provisional);
            if reselected {
                inner.conversation = Some(ConversationId::Confirmed(promotion.confirmed.clone()));
                self.publish(&inner);
            }
            drop(inner);

            self.apply_promotion(&promotion).await;
            if let Ok(reply) = &result {
                let confirmed = ConversationId::Confirmed(promotion.confirmed.clone());
                self.record_exchange(&confirmed, reply.bot_message.timestamp)
                    .await;
            }
            if reselected {
                self.refresh.notify_one();
            }
            return SendOutcome::Superseded;
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                inner.overlay.settle(&prepared.local_id, OptimisticStatus::Failed);
                inner.phase = SyncPhase::Error;
                inner.notice = Some(Notice::from_error(&err));
                self.publish(&inner);
                // Only the notice outlives the failure.
                inner.phase = SyncPhase::Synced;
                self.publish(&inner);
                tracing::warn!(
                    "[MessageSynchronizer] Send to {} failed: {}",
                    prepared.conversation,
                    err
                );
                return SendOutcome::Failed(err);
            }
        };

        inner.overlay.settle(&prepared.local_id, OptimisticStatus::Confirmed);
        if let Some(promotion) = &promotion {
            inner.conversation = inner.conversation.as_ref().map(|id| id.promoted(promotion));
            inner.snapshot.promote(promotion);
        }
        inner
            .snapshot
            .fold([reply.user_message.clone(), reply.bot_message.clone()]);
        inner.phase = SyncPhase::Synced;
        self.publish(&inner);
        let conversation = inner.conversation.clone();
        drop(inner);

        if let Some(promotion) = &promotion {
            self.apply_promotion(promotion).await;
        }
        if let Some(conversation) = conversation {
            self.record_exchange(&conversation, reply.bot_message.timestamp)
                .await;
        }
        self.refresh.notify_one();
        SendOutcome::Confirmed(reply)
    }

    async fn apply_promotion(&self, promotion: &Promotion) {
        tracing::info!(
            "[MessageSynchronizer] Conversation {} confirmed as {}",
            promotion.provisional,
            promotion.confirmed
        );
        if let Err(e) = self.selector.promote(promotion).await {
            tracing::warn!("[MessageSynchronizer] Failed to persist promoted selection: {}", e);
        }
        self.directory.promote(promotion).await;
    }

    async fn record_exchange(&self, conversation: &ConversationId, at: DateTime<Utc>) {
        let updated = match self.directory.record_exchange(conversation, 2, at).await {
            Some(updated) => Some(updated),
            None => self
                .selector
                .current()
                .filter(|current| &current.id == conversation)
                .map(|mut current| {
                    current.record_exchange(2, at);
                    current
                }),
        };
        if let Some(updated) = updated {
            if let Err(e) = self.selector.refresh_current(&updated).await {
                tracing::warn!("[MessageSynchronizer] Failed to persist selection: {}", e);
            }
        }
    }
}
