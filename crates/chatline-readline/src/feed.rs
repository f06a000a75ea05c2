//! Turns successive sync views into terminal output events.
//!
//! A terminal cannot redraw, so the feed remembers what it already printed
//! and only emits what is new. A pending message is printed once; its
//! confirmed copy is then swallowed instead of being printed a second time.

use chatline_application::sync::{Delivery, Notice, SyncView};
use chatline_core::ids::{ConversationId, MessageId};
use chatline_core::message::Message;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The view now shows another conversation (or none).
    Switched(Option<ConversationId>),
    Pending(Message),
    Message(Message),
    Thinking,
    Notice(Notice),
}

#[derive(Debug, Default)]
pub struct TranscriptFeed {
    epoch: Option<u64>,
    shown: HashSet<MessageId>,
    /// Contents printed as pending and not yet matched by a server copy.
    unconfirmed: Vec<String>,
    thinking: bool,
    notice: Option<Notice>,
}

impl TranscriptFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, view: &SyncView) -> Vec<FeedEvent> {
        let mut events = Vec::new();

        if self.epoch != Some(view.epoch) {
            let first = self.epoch.is_none();
            self.epoch = Some(view.epoch);
            self.shown.clear();
            self.unconfirmed.clear();
            self.thinking = false;
            if !first || view.conversation.is_some() {
                events.push(FeedEvent::Switched(view.conversation.clone()));
            }
        }

        for visible in &view.messages {
            let message = &visible.message;
            if !self.shown.insert(message.id.clone()) {
                continue;
            }
            match visible.delivery {
                Delivery::Pending => {
                    self.unconfirmed.push(message.content.clone());
                    events.push(FeedEvent::Pending(message.clone()));
                }
                Delivery::Confirmed => {
                    let echoed = message.is_user()
                        && self
                            .unconfirmed
                            .iter()
                            .position(|content| *content == message.content)
                            .map(|at| self.unconfirmed.remove(at))
                            .is_some();
                    if !echoed {
                        events.push(FeedEvent::Message(message.clone()));
                    }
                }
            }
        }

        if view.awaiting_reply && !self.thinking {
            events.push(FeedEvent::Thinking);
        }
        self.thinking = view.awaiting_reply;

        if view.notice != self.notice {
            if let Some(notice) = &view.notice {
                // A failed send never reaches the server copy.
                self.unconfirmed.clear();
                events.push(FeedEvent::Notice(notice.clone()));
            }
            self.notice = view.notice.clone();
        }

        events
    }

    /// Forgets what was printed so the next update replays the transcript.
    pub fn replay(&mut self) {
        self.shown.clear();
        self.unconfirmed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_application::sync::{SyncPhase, VisibleMessage};
    use chatline_core::error::FailureKind;
    use chatline_core::ids::ServerId;
    use chatline_core::message::{MessagePayload, MessageRole};
    use chrono::Utc;

    fn conv() -> ConversationId {
        ConversationId::Confirmed(ServerId::new("c1"))
    }

    fn visible(id: &str, role: MessageRole, content: &str, delivery: Delivery) -> VisibleMessage {
        VisibleMessage {
            message: Message {
                id: MessageId::new(id),
                conversation_id: conv(),
                content: content.to_string(),
                role,
                timestamp: Utc::now(),
                payload: MessagePayload::Text,
            },
            delivery,
        }
    }

    fn view(epoch: u64, messages: Vec<VisibleMessage>) -> SyncView {
        SyncView {
            phase: SyncPhase::Synced,
            conversation: Some(conv()),
            epoch,
            messages,
            notice: None,
            awaiting_reply: false,
        }
    }

    #[test]
    fn test_confirmed_echo_is_not_printed_twice() {
        let mut feed = TranscriptFeed::new();
        let mut sending = view(
            1,
            vec![visible("local_1", MessageRole::User, "hi", Delivery::Pending)],
        );
        sending.awaiting_reply = true;

        let events = feed.update(&sending);
        assert!(matches!(events[0], FeedEvent::Switched(Some(_))));
        assert!(matches!(events[1], FeedEvent::Pending(_)));
        assert_eq!(events[2], FeedEvent::Thinking);

        let events = feed.update(&view(
            1,
            vec![
                visible("u1", MessageRole::User, "hi", Delivery::Confirmed),
                visible("b1", MessageRole::Assistant, "hello!", Delivery::Confirmed),
            ],
        ));
        assert_eq!(events.len(), 1);
        match &events[0] {
            FeedEvent::Message(message) => assert_eq!(message.id.as_str(), "b1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_messages_from_elsewhere_are_printed() {
        let mut feed = TranscriptFeed::new();
        feed.update(&view(1, vec![]));
        let events = feed.update(&view(
            1,
            vec![visible("u7", MessageRole::User, "from my phone", Delivery::Confirmed)],
        ));
        assert!(matches!(&events[0], FeedEvent::Message(m) if m.content == "from my phone"));

        let again = view(
            1,
            vec![visible("u7", MessageRole::User, "from my phone", Delivery::Confirmed)],
        );
        assert!(feed.update(&again).is_empty());
    }

    #[test]
    fn test_epoch_change_starts_a_new_transcript() {
        let mut feed = TranscriptFeed::new();
        let history = vec![visible("u1", MessageRole::User, "a", Delivery::Confirmed)];
        feed.update(&view(1, history.clone()));

        let events = feed.update(&view(2, history));
        assert!(matches!(events[0], FeedEvent::Switched(_)));
        assert!(matches!(events[1], FeedEvent::Message(_)));
    }

    #[test]
    fn test_notice_is_reported_once() {
        let mut feed = TranscriptFeed::new();
        let mut failed = view(1, vec![]);
        failed.phase = SyncPhase::Error;
        failed.notice = Some(Notice {
            kind: FailureKind::Transport,
            text: "Message not sent".to_string(),
        });

        assert!(feed.update(&failed).iter().any(|e| matches!(e, FeedEvent::Notice(_))));
        assert!(feed.update(&failed).is_empty());
    }

    #[test]
    fn test_replay_prints_everything_again() {
        let mut feed = TranscriptFeed::new();
        let current = view(1, vec![visible("u1", MessageRole::User, "a", Delivery::Confirmed)]);
        feed.update(&current);
        feed.replay();
        assert_eq!(feed.update(&current).len(), 1);
    }
}
