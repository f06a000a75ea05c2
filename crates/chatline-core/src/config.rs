//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8787/graphql";

/// Environment variable that overrides [`ClientConfig::endpoint`].
pub const ENDPOINT_ENV_VAR: &str = "GRAPHQL_ENDPOINT";

/// Settings loaded from `config.toml`. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub message_poll_interval_ms: u64,
    pub conversation_poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Length of titles derived from a first message, in characters.
    pub title_max_chars: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            message_poll_interval_ms: 5_000,
            conversation_poll_interval_ms: 10_000,
            request_timeout_secs: 30,
            title_max_chars: 30,
        }
    }
}

impl ClientConfig {
    pub fn message_poll_interval(&self) -> Duration {
        Duration::from_millis(self.message_poll_interval_ms.max(1))
    }

    pub fn conversation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.conversation_poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
