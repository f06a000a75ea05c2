//! Unified path management for chatline files.
//!
//! Everything chatline writes lives under a single config directory so that
//! tests (and users) can relocate it in one place.

use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "chatline";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// The platform config directory could not be determined.
    #[error("Cannot find config directory")]
    ConfigDirNotFound,
}

/// Resolves chatline's on-disk locations.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/chatline/          # Config directory
/// ├── config.toml              # Client configuration
/// ├── state.toml               # Selection and settings
/// └── logs/                    # Application logs
///     └── chatline.log.YYYY-MM-DD
/// ```
#[derive(Debug, Clone)]
pub struct ChatlinePaths {
    base: PathBuf,
}

impl ChatlinePaths {
    /// Resolves the platform config directory, or uses `base_override`.
    pub fn new(base_override: Option<PathBuf>) -> Result<Self, PathError> {
        let base = match base_override {
            Some(base) => base,
            None => dirs::config_dir()
                .ok_or(PathError::ConfigDirNotFound)?
                .join(APP_DIR_NAME),
        };
        Ok(Self { base })
    }

    pub fn config_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.base.join("state.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }
}
