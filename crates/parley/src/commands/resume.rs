use async_trait::async_trait;
use eyre::{Result, bail};
use std::io::Write;
use std::sync::Arc;

use parley_core::api::{HttpChatHistoryApi, MessageCache};
use parley_core::chat::{ChatId, ChatSession, ChatSessionConfig, ChatSessionDeps};
use parley_core::config::ClientConfig;

use super::Command;
use crate::render::{StreamEnd, StreamPrinter, follow_reply};

pub struct ResumeCommand {
    pub client: ClientConfig,
    pub chat: ChatId,
}

#[async_trait]
impl Command for ResumeCommand {
    async fn execute(&self) -> Result<()> {
        let history_api = Arc::new(HttpChatHistoryApi::new(self.client.clone())?);
        let cache = Arc::new(MessageCache::new(history_api));
        let messages = cache.get(self.chat).await?;

        let mut stderr = std::io::stderr();
        if !messages.last().is_some_and(|m| m.is_user()) {
            writeln!(stderr, "Nothing to resume: the last message already has a reply.")?;
            return Ok(());
        }

        let mut config =
            ChatSessionConfig::from_client_config(self.chat, &self.client).with_messages(messages);
        config.auto_resume = true;
        let deps = ChatSessionDeps::http(&self.client)?.with_message_cache(cache);

        let session = ChatSession::spawn(config, deps);
        let events = session.subscribe().await?;

        let mut printer = StreamPrinter::new(std::io::stdout());
        let end = follow_reply(&session, events, &mut printer).await?;

        let state = session.state().await?;
        session.shutdown();

        match end {
            StreamEnd::Failed(message) => bail!(message),
            StreamEnd::Stopped => writeln!(stderr, "Stopped.")?,
            StreamEnd::Finished => {
                if state.messages.last().is_some_and(|m| m.is_user()) {
                    writeln!(stderr, "No active stream for this chat.")?;
                }
            }
        }
        Ok(())
    }
}
