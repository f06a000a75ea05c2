//! Conversation directory.
//!
//! Keeps the list of known conversations, mirrors create/delete against the
//! remote service and merges periodic refreshes. Provisional conversations
//! live only here until their first send is confirmed.

use crate::selector::SessionSelector;
use chatline_core::api::ChatApi;
use chatline_core::conversation::{Conversation, DEFAULT_CONVERSATION_TITLE};
use chatline_core::error::Result;
use chatline_core::ids::{ConversationId, Promotion, ProvisionalId, ServerId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The conversation was already gone. Not an error.
    AlreadyAbsent,
}

#[derive(Default)]
struct DirectoryInner {
    conversations: Vec<Conversation>,
    /// Server ids deleted by this client; stale refreshes must not revive them.
    deleted: HashSet<ServerId>,
    /// Provisional ids that have since been promoted.
    aliases: HashMap<ProvisionalId, ServerId>,
    /// Bumped by every local change a refresh issued earlier cannot know about.
    revision: u64,
}

impl DirectoryInner {
    fn resolve(&self, id: &ConversationId) -> ConversationId {
        match id {
            ConversationId::Provisional(provisional) => match self.aliases.get(provisional) {
                Some(confirmed) => ConversationId::Confirmed(confirmed.clone()),
                None => id.clone(),
            },
            ConversationId::Confirmed(_) => id.clone(),
        }
    }

    fn position(&self, id: &ConversationId) -> Option<usize> {
        self.conversations.iter().position(|c| &c.id == id)
    }
}

pub struct ConversationDirectory {
    api: Arc<dyn ChatApi>,
    selector: Arc<SessionSelector>,
    inner: RwLock<DirectoryInner>,
}

impl ConversationDirectory {
    pub fn new(api: Arc<dyn ChatApi>, selector: Arc<SessionSelector>) -> Self {
        Self {
            api,
            selector,
            inner: RwLock::new(DirectoryInner::default()),
        }
    }

    /// Known conversations, most recently updated first. Ties are broken by
    /// id so the order is total.
    pub async fn list(&self) -> Vec<Conversation> {
        let mut conversations = self.inner.read().await.conversations.clone();
        sort_for_listing(&mut conversations);
        conversations
    }

    /// Looks a conversation up, following promotions of provisional ids.
    pub async fn get(&self, id: &ConversationId) -> Option<Conversation> {
        let inner = self.inner.read().await;
        let id = inner.resolve(id);
        inner.conversations.iter().find(|c| c.id == id).cloned()
    }

    /// Maps a promoted provisional id to its confirmed id.
    pub async fn resolve(&self, id: &ConversationId) -> ConversationId {
        self.inner.read().await.resolve(id)
    }

    /// Replaces the server-backed part of the list with a fresh fetch.
    ///
    /// Conversations already known keep their title and only take the
    /// server's counters. Unpromoted provisional entries are kept, and ids
    /// this client deleted are filtered out.
    ///
    /// If the directory changed locally while the fetch was in flight, the
    /// fetched list may predate those changes: it is merged instead, keeping
    /// confirmed entries it lacks and counters newer than its own.
    pub async fn refresh(&self) -> Result<Vec<Conversation>> {
        let issued_at = self.inner.read().await.revision;
        let fetched = self.api.fetch_conversations().await?;

        let refreshed_current = {
            let mut inner = self.inner.write().await;
            let stale = inner.revision != issued_at;
            let mut next: Vec<Conversation> = Vec::with_capacity(fetched.len());
            for mut conversation in fetched {
                let Some(server_id) = conversation.id.as_confirmed() else {
                    continue;
                };
                if inner.deleted.contains(server_id) {
                    continue;
                }
                if let Some(known) = inner.conversations.iter().find(|c| c.id == conversation.id) {
                    conversation.title = known.title.clone();
                    conversation.created_at = known.created_at;
                    if stale && known.updated_at > conversation.updated_at {
                        conversation.updated_at = known.updated_at;
                        conversation.message_count = known.message_count;
                    }
                }
                next.push(conversation);
            }
            if stale {
                let kept: Vec<Conversation> = inner
                    .conversations
                    .iter()
                    .filter(|c| {
                        c.id.as_confirmed()
                            .is_some_and(|id| !inner.deleted.contains(id))
                            && !next.iter().any(|n| n.id == c.id)
                    })
                    .cloned()
                    .collect();
                tracing::debug!(
                    "[ConversationDirectory] Refresh raced local changes, keeping {} entries",
                    kept.len()
                );
                next.extend(kept);
            }
            next.extend(
                inner
                    .conversations
                    .iter()
                    .filter(|c| c.is_provisional())
                    .cloned(),
            );
            inner.conversations = next;
            tracing::debug!(
                "[ConversationDirectory] Refreshed: {} conversations",
                inner.conversations.len()
            );

            let current = self.selector.current_id();
            current.and_then(|id| inner.conversations.iter().find(|c| c.id == id).cloned())
        };

        if let Some(current) = refreshed_current {
            if let Err(e) = self.selector.refresh_current(&current).await {
                tracing::warn!("[ConversationDirectory] Failed to persist selection: {}", e);
            }
        }

        Ok(self.list().await)
    }

    /// Creates a conversation on the server. A missing or blank title falls
    /// back to the default placeholder.
    pub async fn create(&self, title: Option<&str>) -> Result<Conversation> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_TITLE);
        let conversation = self.api.create_conversation(Some(title)).await?;
        tracing::info!(
            "[ConversationDirectory] Created conversation {} ({})",
            conversation.id,
            conversation.title
        );

        let mut inner = self.inner.write().await;
        match inner.position(&conversation.id) {
            Some(index) => inner.conversations[index] = conversation.clone(),
            None => inner.conversations.push(conversation.clone()),
        }
        inner.revision += 1;
        Ok(conversation)
    }

    /// Adds a locally synthesized conversation.
    pub async fn insert_provisional(&self, conversation: Conversation) {
        let mut inner = self.inner.write().await;
        if inner.position(&conversation.id).is_none() {
            inner.conversations.push(conversation);
        }
    }

    /// Rewrites a provisional entry to its confirmed id.
    ///
    /// If a refresh already brought in the confirmed conversation, the
    /// provisional entry is dropped in its favour so the list never holds the
    /// same conversation twice.
    pub async fn promote(&self, promotion: &Promotion) -> Option<Conversation> {
        let mut inner = self.inner.write().await;
        inner
            .aliases
            .insert(promotion.provisional.clone(), promotion.confirmed.clone());
        inner.revision += 1;

        let provisional_id = ConversationId::Provisional(promotion.provisional.clone());
        let confirmed_id = ConversationId::Confirmed(promotion.confirmed.clone());
        let provisional_index = inner.position(&provisional_id)?;

        if inner.position(&confirmed_id).is_some() {
            inner.conversations.remove(provisional_index);
        } else {
            inner.conversations[provisional_index].id = confirmed_id.clone();
        }
        tracing::debug!(
            "[ConversationDirectory] Promoted {} -> {}",
            promotion.provisional,
            promotion.confirmed
        );
        inner.conversations.iter().find(|c| c.id == confirmed_id).cloned()
    }

    /// Applies the counters of a confirmed send.
    pub async fn record_exchange(
        &self,
        id: &ConversationId,
        added_messages: u32,
        at: DateTime<Utc>,
    ) -> Option<Conversation> {
        let mut inner = self.inner.write().await;
        let id = inner.resolve(id);
        let index = inner.position(&id)?;
        inner.revision += 1;
        let conversation = &mut inner.conversations[index];
        conversation.record_exchange(added_messages, at);
        Some(conversation.clone())
    }

    /// Deletes a conversation. Idempotent: deleting an id that is already
    /// gone reports [`DeleteOutcome::AlreadyAbsent`].
    ///
    /// Provisional conversations are removed locally without a network call.
    /// When the deleted conversation is the current selection, the selection
    /// is cleared before this returns.
    pub async fn delete(&self, id: &ConversationId) -> Result<DeleteOutcome> {
        let id = self.resolve(id).await;

        let outcome = match &id {
            ConversationId::Provisional(_) => {
                let mut inner = self.inner.write().await;
                match inner.position(&id) {
                    Some(index) => {
                        inner.conversations.remove(index);
                        DeleteOutcome::Deleted
                    }
                    None => DeleteOutcome::AlreadyAbsent,
                }
            }
            ConversationId::Confirmed(server_id) => {
                if self.inner.read().await.deleted.contains(server_id) {
                    DeleteOutcome::AlreadyAbsent
                } else {
                    let existed = self.api.delete_conversation(server_id).await?;
                    let mut inner = self.inner.write().await;
                    inner.deleted.insert(server_id.clone());
                    let was_listed = match inner.position(&id) {
                        Some(index) => {
                            inner.conversations.remove(index);
                            true
                        }
                        None => false,
                    };
                    if existed || was_listed {
                        DeleteOutcome::Deleted
                    } else {
                        DeleteOutcome::AlreadyAbsent
                    }
                }
            }
        };

        tracing::info!("[ConversationDirectory] Delete {}: {:?}", id, outcome);

        if let Err(e) = self.selector.clear_if_current(&id).await {
            tracing::warn!("[ConversationDirectory] Failed to persist cleared selection: {}", e);
        }
        Ok(outcome)
    }
}

fn sort_for_listing(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockChatApi, MockStateRepository};
    use chrono::Duration;

    fn directory(api: Arc<MockChatApi>) -> (ConversationDirectory, Arc<SessionSelector>) {
        let selector = Arc::new(SessionSelector::new(Arc::new(MockStateRepository::default())));
        (ConversationDirectory::new(api, selector.clone()), selector)
    }

    #[tokio::test]
    async fn test_list_is_newest_first_with_total_order() {
        let api = MockChatApi::new();
        let older = api.seed_conversation("b", "older");
        let mut tied = api.seed_conversation("a", "tied-a");
        let mut tied_b = api.seed_conversation("c", "tied-c");
        tied.updated_at = older.updated_at + Duration::seconds(100);
        tied_b.updated_at = tied.updated_at;
        *api.conversations.lock().unwrap() = vec![older, tied_b, tied];

        let (directory, _) = directory(api);
        let listed = directory.refresh().await.unwrap();

        let titles: Vec<_> = listed.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["tied-a", "tied-c", "older"]);
    }

    #[tokio::test]
    async fn test_create_with_blank_title_uses_placeholder() {
        let api = MockChatApi::new();
        let (directory, _) = directory(api);

        let created = directory.create(Some("   ")).await.unwrap();
        assert_eq!(created.title, DEFAULT_CONVERSATION_TITLE);

        let named = directory.create(Some("  trip plans ")).await.unwrap();
        assert_eq!(named.title, "trip plans");
        assert_eq!(directory.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_twice_is_one_deletion_then_noop() {
        let api = MockChatApi::new();
        api.seed_conversation("c1", "first");
        let (directory, _) = directory(api.clone());
        directory.refresh().await.unwrap();

        let id = ConversationId::Confirmed(ServerId::new("c1"));
        assert_eq!(directory.delete(&id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            directory.delete(&id).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
        assert_eq!(api.deleted.lock().unwrap().len(), 1);
        assert!(directory.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_an_error() {
        let api = MockChatApi::new();
        let (directory, _) = directory(api);

        let id = ConversationId::Confirmed(ServerId::new("ghost"));
        assert_eq!(
            directory.delete(&id).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn test_delete_current_clears_selection() {
        let api = MockChatApi::new();
        let conversation = api.seed_conversation("c1", "first");
        let (directory, selector) = directory(api);
        directory.refresh().await.unwrap();
        selector.select(Some(conversation.clone())).await.unwrap();

        directory.delete(&conversation.id).await.unwrap();
        assert!(selector.current().is_none());
    }

    #[tokio::test]
    async fn test_refresh_does_not_revive_deleted_conversation() {
        let api = MockChatApi::new();
        let conversation = api.seed_conversation("c1", "first");
        let (directory, _) = directory(api.clone());
        directory.refresh().await.unwrap();
        directory.delete(&conversation.id).await.unwrap();

        // A lagging server still lists it.
        api.conversations.lock().unwrap().push(conversation);
        assert!(directory.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provisional_delete_stays_local() {
        let api = MockChatApi::new();
        let (directory, _) = directory(api.clone());
        let provisional = Conversation::provisional("draft", 30, Utc::now());
        directory.insert_provisional(provisional.clone()).await;

        assert_eq!(
            directory.delete(&provisional.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert!(api.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_keeps_unpromoted_provisional_entries() {
        let api = MockChatApi::new();
        api.seed_conversation("c1", "server");
        let (directory, _) = directory(api);
        let provisional = Conversation::provisional("draft", 30, Utc::now());
        directory.insert_provisional(provisional.clone()).await;

        let listed = directory.refresh().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|c| c.id == provisional.id));
    }

    #[tokio::test]
    async fn test_promote_never_duplicates_entries() {
        let api = MockChatApi::new();
        let (directory, _) = directory(api.clone());
        let provisional = Conversation::provisional("draft", 30, Utc::now());
        let provisional_id = provisional.id.as_provisional().cloned().unwrap();
        directory.insert_provisional(provisional.clone()).await;

        // The server-side copy shows up in a refresh before the promotion lands.
        api.seed_conversation("srv-9", "draft");
        directory.refresh().await.unwrap();
        let promotion = provisional_id.promote(ServerId::new("srv-9"));
        let promoted = directory.promote(&promotion).await.unwrap();

        assert_eq!(promoted.id, ConversationId::Confirmed(ServerId::new("srv-9")));
        assert_eq!(directory.list().await.len(), 1);
        assert_eq!(
            directory.get(&provisional.id).await.map(|c| c.id),
            Some(promoted.id)
        );
    }

    #[tokio::test]
    async fn test_refresh_racing_create_keeps_the_new_conversation() {
        let api = MockChatApi::new();
        let (directory, selector) = directory(api.clone());
        let directory = Arc::new(directory);

        let gate = api.gate_conversation_fetches();
        let refreshing = {
            let directory = directory.clone();
            tokio::spawn(async move { directory.refresh().await })
        };
        gate.entered.notified().await;

        let created = directory.create(Some("fresh")).await.unwrap();
        selector.select(Some(created.clone())).await.unwrap();
        gate.release();

        let listed = refreshing.await.unwrap().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert!(directory.get(&created.id).await.is_some());

        // With nothing changed in between, the server list is taken as is.
        api.ungate();
        api.conversations.lock().unwrap().clear();
        assert!(directory.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_racing_send_keeps_newer_counters() {
        let api = MockChatApi::new();
        let conversation = api.seed_conversation("c1", "chat");
        let (directory, _) = directory(api.clone());
        let directory = Arc::new(directory);
        directory.refresh().await.unwrap();

        let gate = api.gate_conversation_fetches();
        let refreshing = {
            let directory = directory.clone();
            tokio::spawn(async move { directory.refresh().await })
        };
        gate.entered.notified().await;

        let at = conversation.updated_at + Duration::seconds(30);
        directory.record_exchange(&conversation.id, 2, at).await.unwrap();
        gate.release();

        let listed = refreshing.await.unwrap().unwrap();
        assert_eq!(listed[0].message_count, 2);
        assert_eq!(listed[0].updated_at, at);
    }

    #[tokio::test]
    async fn test_refresh_only_updates_counters_of_known_conversations() {
        let api = MockChatApi::new();
        api.seed_conversation("c1", "local title");
        let (directory, _) = directory(api.clone());
        directory.refresh().await.unwrap();

        {
            let mut conversations = api.conversations.lock().unwrap();
            conversations[0].title = "renamed".to_string();
            conversations[0].message_count = 4;
        }
        let listed = directory.refresh().await.unwrap();
        assert_eq!(listed[0].title, "local title");
        assert_eq!(listed[0].message_count, 4);
    }
}
