use async_trait::async_trait;
use chrono::Local;
use comfy_table::{Cell, Color, Table};
use eyre::Result;
use std::io::Write;
use std::sync::Arc;

use parley_core::api::{ChatHistory, ChatHistoryApi, HttpChatHistoryApi};
use parley_core::chat::{ChatId, MessagePart, UiMessage};
use parley_core::config::ClientConfig;

use super::Command;

pub enum ChatsAction {
    List { limit: usize, all: bool },
    Delete { chat: ChatId },
    Show { chat: ChatId },
}

pub struct ChatsCommand {
    pub client: ClientConfig,
    pub action: ChatsAction,
}

#[async_trait]
impl Command for ChatsCommand {
    async fn execute(&self) -> Result<()> {
        let api: Arc<dyn ChatHistoryApi> = Arc::new(HttpChatHistoryApi::new(self.client.clone())?);
        match &self.action {
            ChatsAction::List { limit, all } => list(api, *limit, *all).await,
            ChatsAction::Delete { chat } => {
                api.delete_chat(*chat).await?;
                let mut stdout = std::io::stdout();
                writeln!(stdout, "Deleted chat {chat}")?;
                Ok(())
            }
            ChatsAction::Show { chat } => {
                let messages = api.messages(*chat).await?;
                let mut stdout = std::io::stdout();
                write_transcript(&mut stdout, &messages)?;
                Ok(())
            }
        }
    }
}

async fn list(api: Arc<dyn ChatHistoryApi>, limit: usize, all: bool) -> Result<()> {
    let mut history = ChatHistory::with_page_size(api, limit.max(1));
    history.fetch_next_page().await?;
    while all && history.fetch_next_page().await? {}

    let mut stdout = std::io::stdout();
    if history.is_empty() {
        writeln!(stdout, "No chats found.")?;
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID").fg(Color::Green),
        Cell::new("Created").fg(Color::Green),
        Cell::new("Visibility").fg(Color::Green),
        Cell::new("Title").fg(Color::Green),
    ]);
    for chat in history.items() {
        table.add_row(vec![
            Cell::new(chat.id),
            Cell::new(
                chat.created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S"),
            ),
            Cell::new(chat.visibility),
            Cell::new(&chat.title),
        ]);
    }
    writeln!(stdout, "{table}")?;

    if history.has_next_page() {
        writeln!(stdout, "More chats available. Use --all to list everything.")?;
    }
    Ok(())
}

pub fn write_transcript(out: &mut impl Write, messages: &[UiMessage]) -> std::io::Result<()> {
    for message in messages {
        writeln!(out, "[{}]", message.role)?;
        for part in &message.parts {
            match part {
                MessagePart::Text { text } => writeln!(out, "{text}")?,
                MessagePart::Reasoning { reasoning } => writeln!(out, "(reasoning) {reasoning}")?,
                MessagePart::ToolInvocation {
                    tool_name, result, ..
                } => {
                    let status = if result.is_some() { "done" } else { "pending" };
                    writeln!(out, "(tool {tool_name}: {status})")?;
                }
            }
        }
        for attachment in &message.attachments {
            writeln!(out, "(attachment {} {})", attachment.name, attachment.url)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
