//! Application layer for chatline.
//!
//! Coordinates the conversation directory, the session selector, the settings
//! store and the message synchronizer on top of the domain contracts in
//! `chatline-core`.

pub mod client;
pub mod directory;
pub mod dispatch;
pub mod poller;
pub mod selector;
pub mod settings_store;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use client::ChatClient;
pub use directory::{ConversationDirectory, DeleteOutcome};
pub use dispatch::{MessageRenderer, PresentationContract, dispatch, type_label};
pub use selector::{Selection, SessionSelector};
pub use settings_store::SettingsStore;
pub use sync::{MessageSynchronizer, PollOutcome, SendOutcome, SyncPhase, SyncView};
