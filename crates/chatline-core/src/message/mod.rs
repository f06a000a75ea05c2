//! Message domain module.
//!
//! This module contains message-related domain models and the boundary
//! normalisation that turns raw server records into well-formed messages.
//!
//! # Module Structure
//!
//! - `model`: `Message`, `MessageRole`, `MessageKind`, `SendReply`
//! - `payload`: typed side-payloads (`WeatherReport`, `KnowledgeSources`)
//! - `record`: raw `MessageRecord` as delivered by the remote service

mod model;
mod payload;
mod record;

pub use model::{Message, MessageKind, MessageRole, SendReply};
pub use payload::{KnowledgeSources, MessagePayload, WeatherReport};
pub use record::{MessageRecord, parse_timestamp};
