//! State repository trait.

use async_trait::async_trait;

use crate::conversation::Conversation;
use crate::error::Result;
use crate::settings::Settings;
use crate::state::model::AppState;

/// Repository for the persisted client state.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Saves the app state to storage.
    async fn save_state(&self, state: AppState) -> Result<()>;

    async fn get_state(&self) -> Result<AppState>;

    async fn get_current_conversation(&self) -> Option<Conversation>;

    async fn set_current_conversation(&self, conversation: Conversation) -> Result<()>;

    async fn clear_current_conversation(&self) -> Result<()>;

    async fn get_settings(&self) -> Settings;

    async fn set_settings(&self, settings: Settings) -> Result<()>;
}
