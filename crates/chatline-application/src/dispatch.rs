//! Message render dispatch.
//!
//! Routes each message to the presentation contract for its type. Renderers
//! implement [`MessageRenderer`]; the synchronization core never sees them.

use chatline_core::message::{
    KnowledgeSources, Message, MessageKind, MessagePayload, WeatherReport,
};

/// The presentation contracts a renderer must honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationContract {
    /// Markdown-capable text bubble.
    Text,
    /// Text plus a weather card.
    WeatherCard,
    /// Text plus a sources list with a confidence gauge.
    KnowledgeCard,
}

impl PresentationContract {
    pub fn for_kind(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Text => Self::Text,
            MessageKind::Weather => Self::WeatherCard,
            MessageKind::Knowledge => Self::KnowledgeCard,
        }
    }
}

pub trait MessageRenderer {
    type Output;

    fn render_text(&mut self, message: &Message) -> Self::Output;

    fn render_weather(&mut self, message: &Message, report: &WeatherReport) -> Self::Output;

    fn render_knowledge(&mut self, message: &Message, sources: &KnowledgeSources)
    -> Self::Output;
}

/// Renders `message` through the contract its payload selects.
pub fn dispatch<R: MessageRenderer + ?Sized>(renderer: &mut R, message: &Message) -> R::Output {
    match &message.payload {
        MessagePayload::Text => renderer.render_text(message),
        MessagePayload::Weather(report) => renderer.render_weather(message, report),
        MessagePayload::Knowledge(sources) => renderer.render_knowledge(message, sources),
    }
}

/// The type chip shown beside assistant messages. User messages carry none.
pub fn type_label(message: &Message) -> Option<&'static str> {
    if message.is_user() {
        None
    } else {
        Some(message.kind().label())
    }
}
