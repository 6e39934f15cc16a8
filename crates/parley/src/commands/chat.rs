use async_trait::async_trait;
use eyre::{Result, bail};
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parley_core::api::{HttpChatHistoryApi, MessageCache, UploadFile};
use parley_core::chat::{ChatId, ChatSession, ChatSessionConfig, ChatSessionDeps, Visibility};
use parley_core::config::ClientConfig;
use parley_core::drafts::DraftStore;
use parley_core::model_registry::ModelRegistry;
use parley_core::preferences::Preferences;
use parley_toolkits::ToolkitId;

use super::Command;
use crate::error::Error;
use crate::render::{StreamEnd, StreamPrinter, follow_reply};

pub struct ChatCommand {
    pub client: ClientConfig,
    pub chat: Option<ChatId>,
    pub model: Option<String>,
    pub image_model: Option<String>,
    pub visibility: Option<Visibility>,
    pub attachments: Vec<PathBuf>,
    pub toolkits: Vec<String>,
    pub no_search: bool,
    pub message: Option<String>,
}

#[async_trait]
impl Command for ChatCommand {
    async fn execute(&self) -> Result<()> {
        let preferences = preferences_or_default(Preferences::load());
        let registry = ModelRegistry::load()?;

        let model = match self.model.as_deref().or(preferences.default_model.as_deref()) {
            Some(name) => registry.resolve(name)?.clone(),
            None => match registry.default_language_model() {
                Some(model) => model.clone(),
                None => bail!("No chat models are configured"),
            },
        };
        let image_model = self
            .image_model
            .as_deref()
            .or(preferences.default_image_model.as_deref())
            .map(|name| registry.resolve_image(name).cloned())
            .transpose()?;

        let text = self.read_message()?;

        let history_api = Arc::new(HttpChatHistoryApi::new(self.client.clone())?);
        let cache = Arc::new(MessageCache::new(history_api));
        let (chat_id, messages) = match self.chat {
            Some(chat_id) => (chat_id, cache.get(chat_id).await?),
            None => (ChatId::new(), Vec::new()),
        };

        let mut deps = ChatSessionDeps::http(&self.client)?.with_message_cache(cache);
        if let Ok(drafts) = DraftStore::open_default() {
            deps = deps.with_drafts(drafts);
        }

        let mut config = ChatSessionConfig::from_client_config(chat_id, &self.client)
            .with_model(model)
            .with_visibility(self.visibility.unwrap_or(preferences.default_visibility))
            .with_messages(messages);
        config.image_model = image_model;
        // A fresh message is about to be sent; do not reattach to an older stream.
        config.auto_resume = false;

        let session = ChatSession::spawn(config, deps);
        let mut stderr = std::io::stderr();
        if self.chat.is_none() {
            writeln!(stderr, "Chat ID: {chat_id}")?;
        }

        if self.no_search {
            session.set_native_search(false).await?;
        }

        for id in &preferences.toolkits.enabled {
            session.add_toolkit(id.as_str(), json!({})).await?;
        }
        for raw in &self.toolkits {
            let (id, parameters) = parse_toolkit_arg(raw)?;
            session.add_toolkit(id, parameters).await?;
        }

        if !self.attachments.is_empty() {
            let mut files = Vec::with_capacity(self.attachments.len());
            for path in &self.attachments {
                files.push(UploadFile::from_path(path).await?);
            }
            let outcome = session.upload_files(files).await?;
            for failure in &outcome.failures {
                writeln!(stderr, "{}: {}", failure.name, failure.error.user_message())?;
            }
        }

        session.set_input(text).await?;
        let events = session.subscribe().await?;
        session.submit().await?;

        let mut printer = StreamPrinter::new(std::io::stdout());
        let end = follow_reply(&session, events, &mut printer).await?;
        session.shutdown();

        match end {
            StreamEnd::Finished => Ok(()),
            StreamEnd::Stopped => {
                writeln!(stderr, "Stopped.")?;
                Ok(())
            }
            StreamEnd::Failed(message) => bail!(message),
        }
    }
}

impl ChatCommand {
    fn read_message(&self) -> Result<String> {
        if let Some(message) = &self.message {
            return Ok(message.clone());
        }
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        let trimmed = buffer.trim_end().to_string();
        if trimmed.trim().is_empty() {
            bail!("No message given. Pass it as an argument or on stdin.");
        }
        Ok(trimmed)
    }
}

fn preferences_or_default(loaded: parley_core::Result<Preferences>) -> Preferences {
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load preferences, using defaults");
        Preferences::default()
    })
}

/// `ID` or `ID=JSON`. Bare ids get empty parameters.
pub fn parse_toolkit_arg(raw: &str) -> std::result::Result<(ToolkitId, Value), Error> {
    let (id, parameters) = match raw.split_once('=') {
        Some((id, json)) => {
            let parameters =
                serde_json::from_str(json).map_err(|e| Error::ToolkitArg {
                    value: raw.to_string(),
                    message: e.to_string(),
                })?;
            (id, parameters)
        }
        None => (raw, json!({})),
    };

    let id = id.trim();
    if id.is_empty() {
        return Err(Error::ToolkitArg {
            value: raw.to_string(),
            message: "missing toolkit id".to_string(),
        });
    }
    Ok((ToolkitId::from(id), parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("spotify", "spotify", json!({}))]
    #[case("spotify={\"limit\":5}", "spotify", json!({ "limit": 5 }))]
    #[case(" spotify ={}", "spotify", json!({}))]
    fn parses_toolkit_args(#[case] raw: &str, #[case] id: &str, #[case] parameters: Value) {
        let (parsed_id, parsed_parameters) = parse_toolkit_arg(raw).unwrap();
        assert_eq!(parsed_id, ToolkitId::from(id));
        assert_eq!(parsed_parameters, parameters);
    }

    #[test]
    fn unreadable_preferences_fall_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory where the file should be cannot be read as TOML text.
        let path = dir.path().join("preferences.toml");
        std::fs::create_dir(&path).unwrap();

        let loaded = Preferences::load_from(&path);
        assert!(loaded.is_err());
        assert_eq!(preferences_or_default(loaded), Preferences::default());
    }

    #[rstest]
    #[case("spotify={limit")]
    #[case("={}")]
    fn rejects_bad_toolkit_args(#[case] raw: &str) {
        assert!(matches!(
            parse_toolkit_arg(raw),
            Err(Error::ToolkitArg { .. })
        ));
    }
}
