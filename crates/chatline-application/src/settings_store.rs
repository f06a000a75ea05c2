//! Settings store.

use chatline_core::error::Result;
use chatline_core::settings::{Settings, SettingsPatch};
use chatline_core::state::StateRepository;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Persisted user preferences with a single writer.
///
/// Readers get the current value synchronously; `update` serializes writers
/// and persists before publishing.
pub struct SettingsStore {
    state_repository: Arc<dyn StateRepository>,
    tx: watch::Sender<Settings>,
    write_lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(state_repository: Arc<dyn StateRepository>) -> Self {
        let (tx, _rx) = watch::channel(Settings::default());
        Self {
            state_repository,
            tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the persisted settings.
    pub async fn load(&self) -> Settings {
        let settings = self.state_repository.get_settings().await;
        self.tx.send_replace(settings.clone());
        settings
    }

    pub fn get(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Applies `patch` and persists the result.
    ///
    /// Nothing is published if persisting fails.
    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        let _writer = self.write_lock.lock().await;
        if patch.is_empty() {
            return Ok(self.get());
        }
        let next = self.get().patched(&patch);
        self.state_repository.set_settings(next.clone()).await?;
        self.tx.send_replace(next.clone());
        tracing::debug!("[SettingsStore] Updated settings: {:?}", next);
        Ok(next)
    }
}
