//! Domain types and collaborator contracts for the chatline client.

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod ids;
pub mod lookup;
pub mod message;
pub mod settings;
pub mod state;

pub use error::{ChatError, FailureKind, Result};
