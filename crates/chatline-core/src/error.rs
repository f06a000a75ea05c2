//! Error types for the chatline client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, as seen by the user.
///
/// Validation rejections never leave the client; transport and application
/// failures come back from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The request could not complete (connection, timeout, bad status).
    Transport,
    /// The server answered with a structured failure.
    Application,
    /// A local precondition failed before any request was issued.
    Validation,
    /// Everything else (storage, serialization, internal invariants).
    Local,
}

/// A shared error type for the whole client.
///
/// Typed, structured variants with automatic conversion from the
/// common library errors via `From`.
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    /// The remote request could not complete.
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// The server returned one or more structured errors.
    #[error("Server error: {}", .errors.join("; "))]
    Application { errors: Vec<String> },

    /// A local precondition failed.
    #[error("Rejected: {0}")]
    Validation(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an Application error from a list of server messages.
    ///
    /// An empty list still produces a usable error message.
    pub fn application<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut errors: Vec<String> = errors.into_iter().map(Into::into).collect();
        if errors.is_empty() {
            errors.push("unknown server error".to_string());
        }
        Self::Application { errors }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Maps the error onto the user-facing failure taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } => FailureKind::Transport,
            Self::Application { .. } | Self::NotFound { .. } => FailureKind::Application,
            Self::Validation(_) => FailureKind::Validation,
            Self::Io { .. } | Self::Serialization { .. } | Self::Config(_) | Self::Internal(_) => {
                FailureKind::Local
            }
        }
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ChatError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;
