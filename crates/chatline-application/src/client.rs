//! Client facade.
//!
//! `ChatClient` wires the selector, directory, settings store, synchronizer and
//! poller together around one remote API and one state repository.

use crate::directory::{ConversationDirectory, DeleteOutcome};
use crate::poller::Poller;
use crate::selector::SessionSelector;
use crate::settings_store::SettingsStore;
use crate::sync::{MessageSynchronizer, SendOutcome, SyncView};
use chatline_core::api::ChatApi;
use chatline_core::config::ClientConfig;
use chatline_core::conversation::Conversation;
use chatline_core::error::{ChatError, Result};
use chatline_core::ids::ConversationId;
use chatline_core::settings::{Settings, SettingsPatch};
use chatline_core::state::StateRepository;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

pub struct ChatClient {
    config: ClientConfig,
    selector: Arc<SessionSelector>,
    directory: Arc<ConversationDirectory>,
    settings: Arc<SettingsStore>,
    synchronizer: Arc<MessageSynchronizer>,
    poller: Mutex<Option<Poller>>,
}

impl ChatClient {
    /// Builds the client and restores persisted state.
    ///
    /// The persisted selection and settings are loaded first, then the
    /// conversation list is fetched. A failed fetch is logged and left to the
    /// directory poll.
    pub async fn bootstrap(
        config: ClientConfig,
        api: Arc<dyn ChatApi>,
        state_repository: Arc<dyn StateRepository>,
    ) -> Self {
        let selector = Arc::new(SessionSelector::new(state_repository.clone()));
        let settings = Arc::new(SettingsStore::new(state_repository));
        selector.restore().await;
        settings.load().await;

        let directory = Arc::new(ConversationDirectory::new(api.clone(), selector.clone()));
        if let Err(e) = directory.refresh().await {
            tracing::warn!("[ChatClient] Initial conversation fetch failed: {}", e);
        }

        let synchronizer = Arc::new(MessageSynchronizer::new(
            api,
            selector.clone(),
            directory.clone(),
            config.title_max_chars,
        ));

        tracing::info!("[ChatClient] Ready (endpoint {})", config.endpoint);
        Self {
            config,
            selector,
            directory,
            settings,
            synchronizer,
            poller: Mutex::new(None),
        }
    }

    /// Starts background polling. Calling it again while running is a no-op.
    pub async fn start_polling(&self) {
        let mut poller = self.poller.lock().await;
        if poller.is_some() {
            return;
        }
        *poller = Some(Poller::start(
            self.synchronizer.clone(),
            self.directory.clone(),
            &self.selector,
            self.config.message_poll_interval(),
            self.config.conversation_poll_interval(),
        ));
    }

    pub async fn shutdown(&self) {
        if let Some(poller) = self.poller.lock().await.take() {
            poller.shutdown().await;
        }
    }

    pub async fn send(&self, content: &str) -> SendOutcome {
        self.synchronizer.send(content).await
    }

    pub fn view(&self) -> SyncView {
        self.synchronizer.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.synchronizer.subscribe()
    }

    pub async fn dismiss_notice(&self) {
        self.synchronizer.dismiss_notice().await;
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        self.selector.current()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.directory.list().await
    }

    pub async fn refresh_conversations(&self) -> Result<Vec<Conversation>> {
        self.directory.refresh().await
    }

    /// Selects a known conversation.
    pub async fn open(&self, id: &ConversationId) -> Result<Conversation> {
        let conversation = self
            .directory
            .get(id)
            .await
            .ok_or_else(|| ChatError::not_found("Conversation", id.as_str()))?;
        self.select(Some(conversation.clone())).await?;
        Ok(conversation)
    }

    /// Points the selection at `conversation`, or clears it.
    pub async fn select(&self, conversation: Option<Conversation>) -> Result<()> {
        let persisted = self.selector.select(conversation).await;
        self.synchronizer.sync_selection().await;
        persisted
    }

    /// Creates a conversation on the server and selects it.
    pub async fn new_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        let conversation = self.directory.create(title).await?;
        self.select(Some(conversation.clone())).await?;
        Ok(conversation)
    }

    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<DeleteOutcome> {
        let outcome = self.directory.delete(id).await?;
        self.synchronizer.sync_selection().await;
        Ok(outcome)
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        self.settings.update(patch).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
