//! Application state that persists across restarts.
//!
//! Only the current selection and the settings are kept. Message content is
//! always re-fetched from the server.

use crate::conversation::Conversation;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// Persisted client state.
///
/// # File Location
///
/// - Linux: `~/.config/chatline/state.toml`
/// - macOS: `~/Library/Application Support/chatline/state.toml`
/// - Windows: `%APPDATA%\chatline\state.toml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    /// The selected conversation, if any. Stored whole so the selection can be
    /// restored before the directory has been fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_conversation: Option<Conversation>,

    pub settings: Settings,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Theme;

    #[test]
    fn test_new() {
        let state = AppState::new();
        assert!(state.current_conversation.is_none());
        assert_eq!(state.settings, Settings::default());
    }

    #[test]
    fn test_toml_roundtrip_keeps_selection() {
        let mut state = AppState::new();
        state.current_conversation = Some(Conversation::provisional("hi", 30, chrono::Utc::now()));
        state.settings.theme = Theme::Dark;

        let encoded = toml::to_string_pretty(&state).unwrap();
        let decoded: AppState = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }
}
