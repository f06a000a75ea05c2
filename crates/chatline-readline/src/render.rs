//! Terminal presentation of messages, conversations and lookups.

use chatline_application::{MessageRenderer, type_label};
use chatline_core::conversation::Conversation;
use chatline_core::lookup::KnowledgeItem;
use chatline_core::message::{KnowledgeSources, Message, WeatherReport};
use chatline_core::settings::{Settings, Theme};
use chrono::{DateTime, Local, Utc};
use colored::{Color, Colorize};

/// Colours for one theme.
#[derive(Debug, Clone, Copy)]
struct Palette {
    user: Color,
    assistant: Color,
    accent: Color,
    muted: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                user: Color::Green,
                assistant: Color::Blue,
                accent: Color::Magenta,
                muted: Color::BrightBlack,
            },
            Theme::Dark => Self {
                user: Color::BrightGreen,
                assistant: Color::BrightCyan,
                accent: Color::BrightMagenta,
                muted: Color::White,
            },
        }
    }
}

pub struct TerminalRenderer {
    palette: Palette,
}

impl TerminalRenderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            palette: Palette::for_theme(settings.theme),
        }
    }

    fn header(&self, message: &Message) -> String {
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        if message.is_user() {
            format!("{} {}", "you".color(self.palette.user).bold(), time)
        } else {
            let label = type_label(message).unwrap_or_default();
            format!(
                "{} [{}] {}",
                "assistant".color(self.palette.assistant).bold(),
                label.color(self.palette.accent),
                time
            )
        }
    }

    fn body(&self, message: &Message) -> String {
        let color = if message.is_user() {
            self.palette.user
        } else {
            self.palette.assistant
        };
        message
            .content
            .lines()
            .map(|line| format!("  {}", line.color(color)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A pending message, shown until the server confirms it.
    pub fn render_pending(&self, message: &Message) -> String {
        format!(
            "{} {}\n{}",
            "you".color(self.palette.user).bold(),
            "(sending…)".color(self.palette.muted),
            message
                .content
                .lines()
                .map(|line| format!("  {}", line.color(self.palette.muted)))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }

    pub fn render_thinking(&self) -> String {
        "assistant is thinking…".color(self.palette.muted).italic().to_string()
    }

    pub fn render_weather_report(&self, report: &WeatherReport) -> String {
        let title = format!("{} {}", weather_symbol(&report.icon), report.city);
        [
            format!("  ┌ {}", title.color(self.palette.accent).bold()),
            format!("  │ {:.1}°C  {}", report.temperature, report.description),
            format!(
                "  └ humidity {:.0}%  wind {:.1} m/s",
                report.humidity, report.wind_speed
            ),
        ]
        .join("\n")
    }

    pub fn render_conversation_line(
        &self,
        index: usize,
        conversation: &Conversation,
        selected: bool,
        now: DateTime<Utc>,
    ) -> String {
        let marker = if selected { "*" } else { " " };
        let pending = if conversation.is_provisional() {
            " (not saved yet)"
        } else {
            ""
        };
        format!(
            "{marker}{index:>3}. {}{} {}",
            conversation.title.bold(),
            pending.color(self.palette.muted),
            format!(
                "· {} messages · {}",
                conversation.message_count,
                relative_time(conversation.updated_at, now)
            )
            .color(self.palette.muted)
        )
    }

    pub fn render_knowledge_item(&self, item: &KnowledgeItem) -> String {
        let similarity = item
            .similarity
            .map(|s| format!(" ({:.0}% match)", s.clamp(0.0, 1.0) * 100.0))
            .unwrap_or_default();
        let mut lines = vec![format!(
            "  {}{}",
            item.title.color(self.palette.accent).bold(),
            similarity.color(self.palette.muted)
        )];
        lines.extend(item.content.lines().map(|line| format!("    {line}")));
        if !item.tags.is_empty() {
            let tags: Vec<String> = item.tags.iter().map(|t| format!("#{t}")).collect();
            lines.push(format!("    {}", tags.join(" ").color(self.palette.muted)));
        }
        lines.join("\n")
    }

    pub fn render_notice(&self, text: &str) -> String {
        format!("{} {}", "!".red().bold(), text.red())
    }

    pub fn render_system(&self, text: &str) -> String {
        text.color(self.palette.muted).to_string()
    }
}

impl MessageRenderer for TerminalRenderer {
    type Output = String;

    fn render_text(&mut self, message: &Message) -> String {
        format!("{}\n{}", self.header(message), self.body(message))
    }

    fn render_weather(&mut self, message: &Message, report: &WeatherReport) -> String {
        format!(
            "{}\n{}\n{}",
            self.header(message),
            self.body(message),
            self.render_weather_report(report)
        )
    }

    fn render_knowledge(&mut self, message: &Message, sources: &KnowledgeSources) -> String {
        let mut lines = vec![self.header(message), self.body(message)];
        lines.push(format!(
            "  {} {}",
            confidence_gauge(sources.confidence),
            format!("{}% confidence", sources.confidence_percent()).color(self.palette.muted)
        ));
        if sources.sources.is_empty() {
            lines.push(format!("  {}", "no sources".color(self.palette.muted)));
        }
        for source in &sources.sources {
            lines.push(format!("  · {}", source.color(self.palette.accent)));
        }
        lines.join("\n")
    }
}

/// Ten-cell bar for a confidence in `[0, 1]`.
fn confidence_gauge(confidence: f64) -> String {
    let filled = (confidence.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(10 - filled))
}

fn weather_symbol(icon: &str) -> &'static str {
    match icon.get(..2) {
        Some("01") => "☀",
        Some("02") | Some("03") | Some("04") => "☁",
        Some("09") | Some("10") => "☂",
        Some("11") => "⚡",
        Some("13") => "❄",
        Some("50") => "≋",
        _ => "·",
    }
}

/// "just now", "5m ago", "3h ago", "2d ago", then the date.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        then.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_application::dispatch;
    use chatline_core::ids::{ConversationId, MessageId, ServerId};
    use chatline_core::message::{MessagePayload, MessageRole};
    use chrono::Duration;

    fn plain() {
        colored::control::set_override(false);
    }

    fn assistant(payload: MessagePayload) -> Message {
        Message {
            id: MessageId::new("b1"),
            conversation_id: ConversationId::Confirmed(ServerId::new("c1")),
            content: "Here you go".to_string(),
            role: MessageRole::Assistant,
            timestamp: Utc::now(),
            payload,
        }
    }

    #[test]
    fn test_weather_card_shows_report() {
        plain();
        let mut renderer = TerminalRenderer::new(&Settings::default());
        let message = assistant(MessagePayload::Weather(WeatherReport {
            city: "Lisbon".to_string(),
            temperature: 23.44,
            description: "clear sky".to_string(),
            humidity: 55.0,
            wind_speed: 4.2,
            icon: "01d".to_string(),
        }));

        let output = dispatch(&mut renderer, &message);
        assert!(output.contains("[天气]"));
        assert!(output.contains("☀ Lisbon"));
        assert!(output.contains("23.4°C  clear sky"));
        assert!(output.contains("humidity 55%  wind 4.2 m/s"));
    }

    #[test]
    fn test_knowledge_card_shows_sources_and_confidence() {
        plain();
        let mut renderer = TerminalRenderer::new(&Settings::default());
        let message = assistant(MessagePayload::Knowledge(KnowledgeSources::new(
            vec!["handbook.md".to_string()],
            0.72,
        )));

        let output = dispatch(&mut renderer, &message);
        assert!(output.contains("[███████░░░] 72% confidence"));
        assert!(output.contains("· handbook.md"));
    }

    #[test]
    fn test_user_messages_have_no_type_chip() {
        plain();
        let mut renderer = TerminalRenderer::new(&Settings::default());
        let mut message = assistant(MessagePayload::Text);
        message.role = MessageRole::User;
        let output = dispatch(&mut renderer, &message);
        assert!(output.starts_with("you "));
        assert!(!output.contains("[文本]"));
    }

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(relative_time(now - Duration::seconds(20), now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2d ago");
    }

    #[test]
    fn test_confidence_gauge_bounds() {
        assert_eq!(confidence_gauge(0.0), "[░░░░░░░░░░]");
        assert_eq!(confidence_gauge(1.0), "[██████████]");
    }
}
