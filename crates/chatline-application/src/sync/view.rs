//! What the synchronizer publishes to renderers.

use chatline_core::error::{ChatError, FailureKind};
use chatline_core::ids::ConversationId;
use chatline_core::message::Message;

/// Synchronizer state for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No conversation selected, or its first poll has not resolved yet.
    #[default]
    Idle,
    Synced,
    Sending,
    /// A send just failed. Published once with the notice, then the phase
    /// returns to `Synced`; the notice stays until dismissed or the next send.
    Error,
}

/// Whether a visible message is server-confirmed.
///
/// Renderers may dim pending messages but never see a separate type for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Confirmed,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleMessage {
    pub message: Message,
    pub delivery: Delivery,
}

/// A dismissable, user-facing failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: FailureKind,
    pub text: String,
}

impl Notice {
    pub fn from_error(err: &ChatError) -> Self {
        let text = match err {
            ChatError::Transport { .. } => format!("Message not sent, the server is unreachable: {err}"),
            _ => format!("Message not sent: {err}"),
        };
        Self {
            kind: err.failure_kind(),
            text,
        }
    }
}

/// Snapshot of everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncView {
    pub phase: SyncPhase,
    pub conversation: Option<ConversationId>,
    pub epoch: u64,
    /// Confirmed messages by timestamp, then pending sends.
    pub messages: Vec<VisibleMessage>,
    pub notice: Option<Notice>,
    /// The assistant's reply is outstanding.
    pub awaiting_reply: bool,
}

impl SyncView {
    pub fn pending_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.delivery == Delivery::Pending)
            .count()
    }
}
