//! Message synchronization for the selected conversation.
//!
//! # Module Structure
//!
//! - `synchronizer`: `MessageSynchronizer`, the epoch-gated send/poll core
//! - `snapshot`: the confirmed message set and its merge rules
//! - `overlay`: optimistic entries for unconfirmed sends
//! - `view`: what renderers consume

mod overlay;
mod snapshot;
mod synchronizer;
mod view;

pub use overlay::{OptimisticEntry, OptimisticStatus};
pub use synchronizer::{MessageSynchronizer, PollOutcome, SendOutcome};
pub use view::{Delivery, Notice, SyncPhase, SyncView, VisibleMessage};
