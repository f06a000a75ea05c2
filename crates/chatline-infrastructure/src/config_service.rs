//! Client configuration loading.

use crate::paths::ChatlinePaths;
use crate::storage::AtomicTomlFile;
use chatline_core::config::{ClientConfig, ENDPOINT_ENV_VAR};
use chatline_core::error::{ChatError, Result};
use std::path::PathBuf;

/// Loads [`ClientConfig`] from `config.toml`.
///
/// Precedence, lowest to highest: built-in defaults, the config file, the
/// `GRAPHQL_ENDPOINT` environment variable, an explicit endpoint override.
pub struct ConfigService {
    file: AtomicTomlFile<ClientConfig>,
}

impl ConfigService {
    pub fn new(paths: &ChatlinePaths) -> Self {
        Self::at(paths.config_file())
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Reads the config file, writing one with defaults if it is missing.
    pub fn load_or_create(&self) -> Result<ClientConfig> {
        match self.file.load()? {
            Some(config) => Ok(config),
            None => {
                let config = ClientConfig::default();
                self.file.save(&config)?;
                tracing::info!(
                    "[ConfigService] Created default config at {}",
                    self.file.path().display()
                );
                Ok(config)
            }
        }
    }

    /// Loads the file and applies the environment and `endpoint_override`.
    pub fn resolve(&self, endpoint_override: Option<String>) -> Result<ClientConfig> {
        let env_endpoint = std::env::var(ENDPOINT_ENV_VAR).ok();
        let config = apply_endpoint_overrides(self.load_or_create()?, env_endpoint, endpoint_override);
        validate(&config)?;
        Ok(config)
    }
}

fn apply_endpoint_overrides(
    mut config: ClientConfig,
    env_endpoint: Option<String>,
    explicit: Option<String>,
) -> ClientConfig {
    let chosen = explicit
        .or(env_endpoint)
        .map(|endpoint| endpoint.trim().to_string())
        .filter(|endpoint| !endpoint.is_empty());
    if let Some(endpoint) = chosen {
        config.endpoint = endpoint;
    }
    config
}

fn validate(config: &ClientConfig) -> Result<()> {
    let endpoint = config.endpoint.as_str();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ChatError::config(format!(
            "endpoint must be an http(s) URL, got '{}'",
            endpoint
        )));
    }
    if config.request_timeout_secs == 0 {
        return Err(ChatError::config("request_timeout_secs must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::config::DEFAULT_ENDPOINT;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let service = ConfigService::at(path.clone());

        let config = service.load_or_create().unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "message_poll_interval_ms = 1500\n").unwrap();

        let config = ConfigService::at(path).load_or_create().unwrap();
        assert_eq!(config.message_poll_interval_ms, 1500);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.conversation_poll_interval_ms, 10_000);
    }

    #[test]
    fn test_explicit_endpoint_beats_environment() {
        let config = apply_endpoint_overrides(
            ClientConfig::default(),
            Some("http://env:9000/graphql".to_string()),
            Some("https://flag.example/graphql".to_string()),
        );
        assert_eq!(config.endpoint, "https://flag.example/graphql");

        let config = apply_endpoint_overrides(
            ClientConfig::default(),
            Some("http://env:9000/graphql".to_string()),
            None,
        );
        assert_eq!(config.endpoint, "http://env:9000/graphql");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = apply_endpoint_overrides(ClientConfig::default(), Some("  ".to_string()), None);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let config = ClientConfig {
            endpoint: "localhost:8787".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(validate(&config), Err(ChatError::Config(_))));
        assert!(validate(&ClientConfig::default()).is_ok());
    }
}
