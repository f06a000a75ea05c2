//! TOML-backed state repository.
//!
//! Keeps the persisted [`AppState`] cached in memory and writes the whole
//! state back to `state.toml` on every change.

use crate::paths::ChatlinePaths;
use crate::storage::{AtomicTomlError, AtomicTomlFile};
use chatline_core::conversation::Conversation;
use chatline_core::error::{ChatError, Result};
use chatline_core::settings::Settings;
use chatline_core::state::{AppState, StateRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// State repository persisting to a single TOML file.
///
/// Reads are served from the cache. Writes hold the file mutex while the
/// cache is updated and the file rewritten, so the file always reflects the
/// last cached state.
#[derive(Clone)]
pub struct TomlStateRepository {
    state: Arc<Mutex<AppState>>,
    file: Arc<Mutex<AtomicTomlFile<AppState>>>,
}

impl TomlStateRepository {
    /// Opens `state.toml` in the chatline config directory.
    pub async fn new(paths: &ChatlinePaths) -> Result<Self> {
        Self::open(paths.state_file()).await
    }

    /// Opens the state file at `path`.
    ///
    /// A missing file starts from defaults. An unreadable one is logged and
    /// replaced on the next write.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let file = AtomicTomlFile::<AppState>::new(path);
        let (file, loaded) = tokio::task::spawn_blocking(move || {
            let loaded = file.load();
            (file, loaded)
        })
        .await
        .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))?;

        let initial_state = match loaded {
            Ok(state) => state.unwrap_or_default(),
            Err(AtomicTomlError::Parse(e)) => {
                tracing::warn!(
                    "[TomlStateRepository] Ignoring unreadable {}: {}",
                    file.path().display(),
                    e
                );
                AppState::default()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            "[TomlStateRepository] Loaded state from {}",
            file.path().display()
        );

        Ok(Self {
            state: Arc::new(Mutex::new(initial_state)),
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Applies `f` to the cached state and persists the result.
    async fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppState),
    {
        let file = self.file.clone().lock_owned().await;
        let state = {
            let mut cached = self.state.lock().await;
            f(&mut cached);
            cached.clone()
        };
        Self::write(file, state).await
    }

    async fn write(file: OwnedMutexGuard<AtomicTomlFile<AppState>>, state: AppState) -> Result<()> {
        tokio::task::spawn_blocking(move || file.save(&state))
            .await
            .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))??;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateRepository for TomlStateRepository {
    async fn save_state(&self, state: AppState) -> Result<()> {
        let file = self.file.clone().lock_owned().await;
        {
            let mut cached = self.state.lock().await;
            *cached = state.clone();
        }
        Self::write(file, state).await
    }

    async fn get_state(&self) -> Result<AppState> {
        Ok(self.state.lock().await.clone())
    }

    async fn get_current_conversation(&self) -> Option<Conversation> {
        self.state.lock().await.current_conversation.clone()
    }

    async fn set_current_conversation(&self, conversation: Conversation) -> Result<()> {
        self.modify(|state| state.current_conversation = Some(conversation))
            .await
    }

    async fn clear_current_conversation(&self) -> Result<()> {
        self.modify(|state| state.current_conversation = None).await
    }

    async fn get_settings(&self) -> Settings {
        self.state.lock().await.settings.clone()
    }

    async fn set_settings(&self, settings: Settings) -> Result<()> {
        self.modify(|state| state.settings = settings).await
    }
}
