//! GraphQL transport for the assistant backend.
//!
//! # Module Structure
//!
//! - `client`: `GraphqlChatApi`, the reqwest-based implementation of the core API traits
//! - `dto`: request variables and response shapes
//! - `queries`: the GraphQL documents

mod client;
mod dto;
mod queries;

pub use client::GraphqlChatApi;
pub use dto::ConversationRecord;
