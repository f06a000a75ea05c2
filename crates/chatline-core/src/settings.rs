//! User preferences.
//!
//! The option set is closed: every field has a fixed domain and a default, so
//! a settings file written by an older client still loads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub font_size: FontSize,
    pub auto_scroll: bool,
    pub sound_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_size: FontSize::Medium,
            auto_scroll: true,
            sound_enabled: false,
        }
    }
}

/// Partial update: `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub font_size: Option<FontSize>,
    pub auto_scroll: Option<bool>,
    pub sound_enabled: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.font_size.is_none()
            && self.auto_scroll.is_none()
            && self.sound_enabled.is_none()
    }
}

impl Settings {
    /// Returns a copy with `patch` applied.
    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        Self {
            theme: patch.theme.unwrap_or(self.theme),
            font_size: patch.font_size.unwrap_or(self.font_size),
            auto_scroll: patch.auto_scroll.unwrap_or(self.auto_scroll),
            sound_enabled: patch.sound_enabled.unwrap_or(self.sound_enabled),
        }
    }
}
