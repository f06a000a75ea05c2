//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `model`: the `Conversation` entity and its title rules

mod model;

pub use model::{Conversation, DEFAULT_CONVERSATION_TITLE, provisional_title};
