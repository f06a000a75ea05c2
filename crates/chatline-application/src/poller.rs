//! Background refresh loops.
//!
//! Polling stands in for push: the message loop refreshes the selected
//! conversation on a fixed interval, immediately after a selection switch and
//! whenever the synchronizer asks for it (after a send). The directory loop
//! refreshes the conversation list on its own, slower interval. Both stop when
//! the shared cancellation token fires.

use crate::directory::ConversationDirectory;
use crate::selector::SessionSelector;
use crate::sync::{MessageSynchronizer, PollOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

pub struct Poller {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Poller {
    /// Spawns both loops on the current runtime.
    pub fn start(
        synchronizer: Arc<MessageSynchronizer>,
        directory: Arc<ConversationDirectory>,
        selector: &SessionSelector,
        message_interval: Duration,
        conversation_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handles = vec![
            spawn_message_loop(synchronizer, selector, message_interval, cancel.clone()),
            spawn_directory_loop(directory, conversation_interval, cancel.clone()),
        ];
        Self { cancel, handles }
    }

    /// Stops both loops and waits for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!("[Poller] Poll task ended abnormally: {}", e);
            }
        }
    }
}

fn spawn_message_loop(
    synchronizer: Arc<MessageSynchronizer>,
    selector: &SessionSelector,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut selection = selector.subscribe();
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("[Poller] Message polling started ({:?} interval)", period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = synchronizer.refresh_requested() => {}
                changed = selection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    ticker.reset();
                }
            }

            match synchronizer.poll_once().await {
                PollOutcome::Applied { messages } => {
                    tracing::trace!("[Poller] Applied {} messages", messages)
                }
                PollOutcome::Discarded => tracing::trace!("[Poller] Stale poll discarded"),
                PollOutcome::Skipped | PollOutcome::Failed(_) => {}
            }
        }
        tracing::info!("[Poller] Message polling stopped");
    })
}

fn spawn_directory_loop(
    directory: Arc<ConversationDirectory>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("[Poller] Conversation polling started ({:?} interval)", period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = directory.refresh().await {
                tracing::warn!("[Poller] Conversation refresh failed: {}", e);
            }
        }
        tracing::info!("[Poller] Conversation polling stopped");
    })
}
