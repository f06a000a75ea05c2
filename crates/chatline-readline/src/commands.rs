//! REPL input parsing.

use chatline_core::lookup::AddKnowledgeInput;
use chatline_core::settings::{FontSize, SettingsPatch, Theme};

pub const COMMANDS: &[&str] = &[
    "/new",
    "/list",
    "/open",
    "/delete",
    "/close",
    "/show",
    "/settings",
    "/weather",
    "/knowledge",
    "/learn",
    "/dismiss",
    "/help",
    "/quit",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(String),
    New(Option<String>),
    List,
    /// 1-based index into `/list`.
    Open(usize),
    Delete(usize),
    Close,
    Show,
    /// `None` prints the current settings.
    Settings(Option<SettingsPatch>),
    Weather(String),
    Knowledge(String),
    Learn(AddKnowledgeInput),
    Dismiss,
    Help,
    Quit,
}

/// Parses one input line. Lines not starting with `/` are messages.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(Command::Send(line.to_string()));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name {
        "/new" => Ok(Command::New(non_empty(rest))),
        "/list" | "/ls" => Ok(Command::List),
        "/open" => index_arg(rest, "/open").map(Command::Open),
        "/delete" | "/rm" => index_arg(rest, "/delete").map(Command::Delete),
        "/close" => Ok(Command::Close),
        "/show" => Ok(Command::Show),
        "/settings" => {
            if rest.is_empty() {
                Ok(Command::Settings(None))
            } else {
                parse_settings(rest).map(|patch| Command::Settings(Some(patch)))
            }
        }
        "/weather" => required(rest, "/weather <city>").map(Command::Weather),
        "/knowledge" | "/kb" => required(rest, "/knowledge <query>").map(Command::Knowledge),
        "/learn" => parse_learn(rest).map(Command::Learn),
        "/dismiss" => Ok(Command::Dismiss),
        "/help" | "/?" => Ok(Command::Help),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command {other}, try /help")),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn required(value: &str, usage: &str) -> Result<String, String> {
    non_empty(value).ok_or_else(|| format!("Usage: {usage}"))
}

fn index_arg(value: &str, command: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(format!("Usage: {command} <n> (number from /list)")),
    }
}

/// `key=value` pairs: `theme`, `font`, `autoscroll`, `sound`.
fn parse_settings(args: &str) -> Result<SettingsPatch, String> {
    let mut patch = SettingsPatch::default();
    for pair in args.split_whitespace() {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got '{pair}'"))?;
        match key {
            "theme" => {
                patch.theme = Some(match value {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    _ => return Err(format!("theme must be light or dark, got '{value}'")),
                })
            }
            "font" | "font_size" => {
                patch.font_size = Some(match value {
                    "small" => FontSize::Small,
                    "medium" => FontSize::Medium,
                    "large" => FontSize::Large,
                    _ => return Err(format!("font must be small, medium or large, got '{value}'")),
                })
            }
            "autoscroll" | "auto_scroll" => patch.auto_scroll = Some(switch(key, value)?),
            "sound" => patch.sound_enabled = Some(switch(key, value)?),
            _ => return Err(format!("Unknown setting '{key}'")),
        }
    }
    Ok(patch)
}

fn switch(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(format!("{key} must be on or off, got '{value}'")),
    }
}

/// `<title> | <content> [#tag ...]`
fn parse_learn(args: &str) -> Result<AddKnowledgeInput, String> {
    let usage = || "Usage: /learn <title> | <content> [#tag ...]".to_string();
    let (title, body) = args.split_once('|').ok_or_else(usage)?;
    let title = title.trim();

    let mut tags = Vec::new();
    let mut words = Vec::new();
    for word in body.split_whitespace() {
        match word.strip_prefix('#') {
            Some(tag) if !tag.is_empty() => tags.push(tag.to_string()),
            _ => words.push(word),
        }
    }
    let content = words.join(" ");
    if title.is_empty() || content.is_empty() {
        return Err(usage());
    }

    Ok(AddKnowledgeInput {
        title: title.to_string(),
        content,
        source: Some("chatline".to_string()),
        tags,
    })
}

pub const HELP: &str = "\
Plain lines are sent to the current conversation (one is created if none is selected).

  /new [title]          start a conversation
  /list                 list conversations
  /open <n>             switch to conversation n
  /delete <n>           delete conversation n
  /close                clear the selection
  /show                 print the current conversation
  /settings [k=v ...]   show or change settings (theme, font, autoscroll, sound)
  /weather <city>       look up the weather
  /knowledge <query>    search the knowledge base
  /learn <t> | <text>   add a knowledge entry, #tags allowed
  /dismiss              dismiss the error notice
  /quit                 exit";
