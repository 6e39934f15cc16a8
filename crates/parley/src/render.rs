use std::collections::HashMap;
use std::io::Write;

use eyre::{Result, eyre};
use parley_core::api::error::GENERIC_ERROR_MESSAGE;
use parley_core::chat::{ChatEvent, ChatSessionHandle, ChatState, ChatStatus, MessageId, UiMessage};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// Writes assistant text as it grows, one message at a time.
pub struct StreamPrinter<W: Write> {
    out: W,
    printed: HashMap<MessageId, String>,
    last: Option<MessageId>,
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: HashMap::new(),
            last: None,
        }
    }

    pub fn on_message(&mut self, message: &UiMessage) -> std::io::Result<()> {
        if !message.is_assistant() {
            return Ok(());
        }

        if self.last.as_ref().is_some_and(|id| *id != message.id) {
            writeln!(self.out)?;
        }
        self.last = Some(message.id.clone());

        let printed = self.printed.entry(message.id.clone()).or_default();
        let content = &message.content;
        // A replaced message starts over on its own line.
        let suffix = match content.strip_prefix(printed.as_str()) {
            Some(suffix) => suffix,
            None => {
                writeln!(self.out)?;
                content.as_str()
            }
        };
        if !suffix.is_empty() {
            write!(self.out, "{suffix}")?;
            self.out.flush()?;
        }
        printed.clone_from(content);
        Ok(())
    }

    pub fn finish(&mut self) -> std::io::Result<()> {
        if self.last.is_some() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    Finished,
    Stopped,
    Failed(String),
}

/// Print the session's reply until the current operation ends. Ctrl-C stops the stream.
pub async fn follow_reply<W: Write>(
    session: &ChatSessionHandle,
    events: broadcast::Receiver<ChatEvent>,
    printer: &mut StreamPrinter<W>,
) -> Result<StreamEnd> {
    let state = session.state().await?;
    let end = if state.status.is_busy() {
        wait_for_end(session, events, printer).await?
    } else {
        settled(&state)
    };

    // Events may have been coalesced or missed before subscribing.
    let state = session.state().await?;
    if let Some(last) = state.messages.last() {
        printer.on_message(last)?;
    }
    printer.finish()?;
    Ok(end)
}

async fn wait_for_end<W: Write>(
    session: &ChatSessionHandle,
    mut events: broadcast::Receiver<ChatEvent>,
    printer: &mut StreamPrinter<W>,
) -> Result<StreamEnd> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let end = loop {
        tokio::select! {
            biased;

            _ = &mut ctrl_c => {
                session.stop().await?;
                break StreamEnd::Stopped;
            }

            event = events.recv() => match event {
                Ok(ChatEvent::MessageAppended { message } | ChatEvent::MessageUpdated { message }) => {
                    printer.on_message(&message)?;
                }
                Ok(ChatEvent::StreamFinished { .. }) => break StreamEnd::Finished,
                Ok(ChatEvent::StreamFailed { message, .. }) => break StreamEnd::Failed(message),
                // Error status is announced before the matching StreamFailed.
                Ok(ChatEvent::StatusChanged { status }) if !status.is_busy() => {
                    break settled(&session.state().await?);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event receiver lagged");
                }
                Err(RecvError::Closed) => return Err(eyre!("Chat session closed unexpectedly")),
            }
        }
    };
    Ok(end)
}

/// How an operation ended, judged from a session that is no longer busy.
fn settled(state: &ChatState) -> StreamEnd {
    match state.status {
        ChatStatus::Error => StreamEnd::Failed(
            state
                .error
                .clone()
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
        ),
        _ => StreamEnd::Finished,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parley_core::api::{ApiError, ChatApi, ChatRequestBody, PartStream, StreamPart, UploadApi, UploadError, UploadFile};
    use parley_core::chat::{Attachment, ChatId, ChatSession, ChatSessionConfig, ChatSessionDeps, Visibility};
    use parley_core::config::LanguageModel;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn assistant(id: &str, text: &str) -> UiMessage {
        let mut message = UiMessage::assistant(MessageId::from(id), Utc::now());
        message.push_text_delta(text);
        message
    }

    #[test]
    fn prints_only_new_suffix() {
        let mut out = Vec::new();
        let mut printer = StreamPrinter::new(&mut out);
        printer.on_message(&assistant("a", "Hel")).unwrap();
        printer.on_message(&assistant("a", "Hello")).unwrap();
        printer.on_message(&assistant("a", "Hello")).unwrap();
        printer.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hello\n");
    }

    #[test]
    fn separates_messages_and_skips_users() {
        let mut out = Vec::new();
        let mut printer = StreamPrinter::new(&mut out);
        printer
            .on_message(&UiMessage::user(MessageId::from("u"), "hi", vec![], Utc::now()))
            .unwrap();
        printer.on_message(&assistant("a", "one")).unwrap();
        printer.on_message(&assistant("b", "two")).unwrap();
        printer.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn reprints_replaced_content() {
        let mut out = Vec::new();
        let mut printer = StreamPrinter::new(&mut out);
        printer.on_message(&assistant("a", "draft answer")).unwrap();
        printer.on_message(&assistant("a", "final")).unwrap();
        printer.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "draft answer\nfinal\n");
    }

    #[test]
    fn reprints_when_prefix_changes() {
        let mut out = Vec::new();
        let mut printer = StreamPrinter::new(&mut out);
        printer.on_message(&assistant("a", "Hello")).unwrap();
        printer.on_message(&assistant("a", "Help me")).unwrap();
        printer.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hello\nHelp me\n");
    }

    struct FailingChat;

    #[async_trait]
    impl ChatApi for FailingChat {
        async fn send(
            &self,
            _body: &ChatRequestBody,
            _token: CancellationToken,
        ) -> Result<PartStream, ApiError> {
            let parts = vec![
                StreamPart::TextDelta {
                    delta: "partial".to_string(),
                },
                StreamPart::Error {
                    error_text: "upstream exploded".to_string(),
                },
            ];
            Ok(Box::pin(futures::stream::iter(parts.into_iter().map(Ok))))
        }

        async fn resume(
            &self,
            _chat_id: ChatId,
            _token: CancellationToken,
        ) -> Result<Option<PartStream>, ApiError> {
            Ok(None)
        }
    }

    struct NoUploads;

    #[async_trait]
    impl UploadApi for NoUploads {
        async fn upload(&self, _file: UploadFile) -> Result<Attachment, UploadError> {
            Err(UploadError::Rejected("uploads disabled".to_string()))
        }
    }

    fn model() -> LanguageModel {
        LanguageModel {
            provider: "openai".to_string(),
            model_id: "gpt-4o".to_string(),
            name: "GPT-4o".to_string(),
            capabilities: vec![],
            aliases: vec![],
        }
    }

    #[tokio::test]
    async fn follow_reply_reports_stream_error() {
        let session = ChatSession::spawn(
            ChatSessionConfig::new(ChatId::new()).with_model(model()),
            ChatSessionDeps::new(Arc::new(FailingChat), Arc::new(NoUploads)),
        );
        session.set_input("Hello").await.unwrap();
        let events = session.subscribe().await.unwrap();
        session.submit().await.unwrap();

        let mut out = Vec::new();
        let mut printer = StreamPrinter::new(&mut out);
        let end = tokio::time::timeout(
            Duration::from_secs(5),
            follow_reply(&session, events, &mut printer),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(end, StreamEnd::Failed(GENERIC_ERROR_MESSAGE.to_string()));
        assert_eq!(String::from_utf8(out).unwrap(), "partial\n");
    }

    #[test]
    fn settled_reads_error_status() {
        let mut state = ChatState::new(ChatId::new(), Visibility::Private);
        assert_eq!(settled(&state), StreamEnd::Finished);

        state.status = ChatStatus::Error;
        state.error = Some("You have exceeded your maximum number of messages for the day! Please try again later.".to_string());
        assert_eq!(
            settled(&state),
            StreamEnd::Failed(
                "You have exceeded your maximum number of messages for the day! Please try again later."
                    .to_string()
            )
        );
    }
}
