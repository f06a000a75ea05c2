mod commands;
mod console;
mod feed;
mod helper;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chatline_application::sync::SendOutcome;
use chatline_application::{ChatClient, DeleteOutcome};
use chatline_core::conversation::Conversation;
use chatline_core::error::ChatError;
use chatline_core::lookup::LookupApi;
use chatline_infrastructure::{ChatlinePaths, ConfigService, GraphqlChatApi, TomlStateRepository};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, HELP};
use crate::console::{Console, spawn_view_printer};
use crate::helper::CliHelper;

#[derive(Parser)]
#[command(name = "chatline", version)]
#[command(about = "Terminal client for the chatline assistant", long_about = None)]
struct Cli {
    /// GraphQL endpoint; overrides config.toml and GRAPHQL_ENDPOINT
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory holding config.toml, state.toml and logs/
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

/// Logs go to a daily file so they never interleave with the REPL.
fn init_logging(paths: &ChatlinePaths) -> Result<WorkerGuard> {
    let logs_dir = paths.logs_dir();
    std::fs::create_dir_all(&logs_dir)?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "chatline.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatline=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

struct Session {
    client: Arc<ChatClient>,
    lookup: Arc<dyn LookupApi>,
    console: Arc<Console>,
}

enum Flow {
    Continue,
    Quit,
}

impl Session {
    async fn handle(&self, command: Command) -> Result<Flow, ChatError> {
        let renderer = self.console.renderer();
        match command {
            Command::Send(text) => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    if let SendOutcome::Rejected(reason) = client.send(&text).await {
                        tracing::debug!("[Repl] Send rejected: {}", reason);
                    }
                });
            }
            Command::New(title) => {
                let conversation = self.client.new_conversation(title.as_deref()).await?;
                println!(
                    "{}",
                    renderer.render_system(&format!("Started '{}'", conversation.title))
                );
            }
            Command::List => {
                let conversations = self.client.conversations().await;
                if conversations.is_empty() {
                    println!("{}", renderer.render_system("No conversations yet"));
                }
                let current = self.client.current_conversation().map(|c| c.id);
                let now = Utc::now();
                for (index, conversation) in conversations.iter().enumerate() {
                    let selected = current.as_ref() == Some(&conversation.id);
                    println!(
                        "{}",
                        renderer.render_conversation_line(index + 1, conversation, selected, now)
                    );
                }
            }
            Command::Open(index) => {
                let conversation = self.nth_conversation(index).await?;
                self.client.open(&conversation.id).await?;
            }
            Command::Delete(index) => {
                let conversation = self.nth_conversation(index).await?;
                let text = match self.client.delete_conversation(&conversation.id).await? {
                    DeleteOutcome::Deleted => format!("Deleted '{}'", conversation.title),
                    DeleteOutcome::AlreadyAbsent => {
                        format!("'{}' was already gone", conversation.title)
                    }
                };
                println!("{}", renderer.render_system(&text));
            }
            Command::Close => self.client.select(None).await?,
            Command::Show => self.console.replay().await,
            Command::Settings(patch) => {
                let settings = match patch {
                    Some(patch) => self.client.update_settings(patch).await?,
                    None => self.client.settings(),
                };
                println!(
                    "{}",
                    renderer.render_system(&format!(
                        "theme={:?} font={:?} autoscroll={} sound={}",
                        settings.theme,
                        settings.font_size,
                        on_off(settings.auto_scroll),
                        on_off(settings.sound_enabled)
                    ))
                );
            }
            Command::Weather(city) => {
                let report = self.lookup.fetch_weather(&city).await?;
                println!("{}", renderer.render_weather_report(&report));
            }
            Command::Knowledge(query) => {
                let items = self.lookup.search_knowledge(&query).await?;
                if items.is_empty() {
                    println!("{}", renderer.render_system("Nothing found"));
                }
                for item in &items {
                    println!("{}", renderer.render_knowledge_item(item));
                }
            }
            Command::Learn(input) => {
                let item = self.lookup.add_knowledge(input).await?;
                println!(
                    "{}",
                    renderer.render_system(&format!("Saved '{}' ({})", item.title, item.id))
                );
            }
            Command::Dismiss => self.client.dismiss_notice().await,
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn nth_conversation(&self, index: usize) -> Result<Conversation, ChatError> {
        self.client
            .conversations()
            .await
            .into_iter()
            .nth(index - 1)
            .ok_or_else(|| ChatError::not_found("Conversation", format!("#{index}")))
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = ChatlinePaths::new(cli.config_dir)?;
    let _log_guard = init_logging(&paths)?;

    let config = ConfigService::new(&paths).resolve(cli.endpoint)?;
    let api = Arc::new(GraphqlChatApi::new(&config)?);
    let state_repository = Arc::new(TomlStateRepository::new(&paths).await?);
    let client = Arc::new(ChatClient::bootstrap(config, api.clone(), state_repository).await);
    client.start_polling().await;

    let console = Arc::new(Console::new(client.clone()));
    let printer = spawn_view_printer(console.clone());
    let session = Session {
        client: client.clone(),
        lookup: api.clone(),
        console,
    };

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", "=== chatline ===".bright_magenta().bold());
    println!(
        "{}",
        format!("Connected to {}. Type /help for commands.", api.endpoint()).bright_black()
    );

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match commands::parse(trimmed) {
                    Ok(command) => command,
                    Err(usage) => {
                        println!("{}", usage.yellow());
                        continue;
                    }
                };
                match session.handle(command).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => {
                        let renderer = session.console.renderer();
                        println!("{}", renderer.render_notice(&e.to_string()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    println!("{}", "Goodbye!".bright_green());
    printer.abort();
    client.shutdown().await;
    Ok(())
}
