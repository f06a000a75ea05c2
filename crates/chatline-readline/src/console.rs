//! Live transcript output.

use std::sync::Arc;

use chatline_application::sync::SyncView;
use chatline_application::{ChatClient, dispatch};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::feed::{FeedEvent, TranscriptFeed};
use crate::render::TerminalRenderer;

pub struct Console {
    client: Arc<ChatClient>,
    feed: Mutex<TranscriptFeed>,
}

impl Console {
    pub fn new(client: Arc<ChatClient>) -> Self {
        Self {
            client,
            feed: Mutex::new(TranscriptFeed::new()),
        }
    }

    pub fn renderer(&self) -> TerminalRenderer {
        TerminalRenderer::new(&self.client.settings())
    }

    /// Prints whatever `view` adds to the transcript.
    ///
    /// With auto-scroll off, live messages are only counted; `/show` prints
    /// them.
    pub async fn show_updates(&self, view: &SyncView, live: bool) {
        let events = self.feed.lock().await.update(view);
        let settings = self.client.settings();
        let mut renderer = TerminalRenderer::new(&settings);
        let mut held_back = 0;

        for event in events {
            match event {
                FeedEvent::Switched(id) => {
                    let title = match (&id, self.client.current_conversation()) {
                        (Some(id), Some(current)) if current.id == *id => current.title,
                        (Some(id), _) => id.as_str().to_string(),
                        (None, _) => "no conversation selected".to_string(),
                    };
                    println!("{}", renderer.render_system(&format!("── {} ──", title)));
                }
                FeedEvent::Pending(message) => println!("{}", renderer.render_pending(&message)),
                FeedEvent::Message(message) => {
                    if live && !settings.auto_scroll {
                        held_back += 1;
                        continue;
                    }
                    println!("{}", dispatch(&mut renderer, &message));
                    if settings.sound_enabled && !message.is_user() {
                        print!("\x07");
                    }
                }
                FeedEvent::Thinking => println!("{}", renderer.render_thinking()),
                FeedEvent::Notice(notice) => {
                    println!("{}", renderer.render_notice(&notice.text));
                    println!("{}", renderer.render_system("(/dismiss to clear)"));
                }
            }
        }

        if held_back > 0 {
            println!(
                "{}",
                renderer.render_system(&format!("{} new message(s), /show to read", held_back))
            );
        }
    }

    /// Prints the whole current conversation again.
    pub async fn replay(&self) {
        self.feed.lock().await.replay();
        self.show_updates(&self.client.view(), false).await;
    }
}

/// Prints view changes as they are published.
pub fn spawn_view_printer(console: Arc<Console>) -> JoinHandle<()> {
    let mut views = console.client.subscribe();
    tokio::spawn(async move {
        loop {
            let view = views.borrow_and_update().clone();
            console.show_updates(&view, true).await;
            if views.changed().await.is_err() {
                break;
            }
        }
    })
}
