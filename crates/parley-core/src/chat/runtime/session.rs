use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parley_toolkits::{ToolkitError, ToolkitId, ToolkitRegistry};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::chat::{ChatApi, HttpChatApi};
use crate::api::history::MessageCache;
use crate::api::upload::{HttpUploadApi, UploadApi, UploadFile, UploadOutcome, upload_all};
use crate::chat::action::Action;
use crate::chat::effect::Effect;
use crate::chat::event::ChatEvent;
use crate::chat::message::UiMessage;
use crate::chat::reduce::{InvalidActionKind, ReduceError, reduce};
use crate::chat::state::ChatState;
use crate::chat::toolkits::{ToolkitBinding, ToolkitBindings};
use crate::chat::types::{ChatId, MessageId, OpId, Visibility};
use crate::config::ClientConfig;
use crate::config::model::{ImageModel, LanguageModel, LanguageModelCapability};
use crate::drafts::DraftStore;

use super::interpreter::EffectInterpreter;

const EVENT_BROADCAST_CAPACITY: usize = 256;
const INTERNAL_ACTION_CAPACITY: usize = 64;

enum SessionCmd {
    Dispatch {
        action: Box<Action>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<ChatEvent>>,
    },
    GetState {
        reply: oneshot::Sender<ChatState>,
    },
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        kind: InvalidActionKind,
    },

    #[error("Reduce error: {message}")]
    ReduceError { message: String },

    #[error(transparent)]
    Toolkit(#[from] ToolkitError),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Initial state of a chat session.
#[derive(Debug, Clone)]
pub struct ChatSessionConfig {
    pub chat_id: ChatId,
    pub visibility: Visibility,
    pub readonly: bool,
    pub auto_resume: bool,
    /// Minimum spacing between `MessageUpdated` events. Zero disables throttling.
    pub stream_throttle: Duration,
    pub initial_messages: Vec<UiMessage>,
    pub model: Option<LanguageModel>,
    pub image_model: Option<ImageModel>,
    pub toolkits: ToolkitBindings,
}

impl ChatSessionConfig {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            visibility: Visibility::default(),
            readonly: false,
            auto_resume: false,
            stream_throttle: Duration::ZERO,
            initial_messages: Vec::new(),
            model: None,
            image_model: None,
            toolkits: ToolkitBindings::new(),
        }
    }

    /// Throttle and auto-resume taken from the client configuration.
    pub fn from_client_config(chat_id: ChatId, config: &ClientConfig) -> Self {
        Self {
            auto_resume: config.auto_resume,
            stream_throttle: config.stream_throttle,
            ..Self::new(chat_id)
        }
    }

    pub fn with_messages(mut self, messages: Vec<UiMessage>) -> Self {
        self.initial_messages = messages;
        self
    }

    pub fn with_model(mut self, model: LanguageModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    fn into_state(self) -> ChatState {
        let mut state =
            ChatState::new(self.chat_id, self.visibility).with_messages(self.initial_messages);
        state.readonly = self.readonly;
        state.auto_resume = self.auto_resume;
        state.use_native_search = self
            .model
            .as_ref()
            .is_some_and(|m| m.has_capability(LanguageModelCapability::WebSearch));
        state.selected_model = self.model;
        state.image_model = self.image_model;
        state.toolkits = self.toolkits;
        state
    }
}

/// Services a session talks to.
#[derive(Clone)]
pub struct ChatSessionDeps {
    pub chat_api: Arc<dyn ChatApi>,
    pub upload_api: Arc<dyn UploadApi>,
    pub toolkits: Arc<ToolkitRegistry>,
    pub drafts: Option<DraftStore>,
    pub message_cache: Option<Arc<MessageCache>>,
}

impl ChatSessionDeps {
    pub fn new(chat_api: Arc<dyn ChatApi>, upload_api: Arc<dyn UploadApi>) -> Self {
        Self {
            chat_api,
            upload_api,
            toolkits: Arc::new(ToolkitRegistry::new()),
            drafts: None,
            message_cache: None,
        }
    }

    /// HTTP clients for the configured service and the built-in toolkits.
    pub fn http(config: &ClientConfig) -> crate::Result<Self> {
        let chat_api = HttpChatApi::new(config.clone())?;
        let upload_api = HttpUploadApi::new(config.clone())?;
        Ok(Self {
            toolkits: Arc::new(ToolkitRegistry::builtin()?),
            ..Self::new(Arc::new(chat_api), Arc::new(upload_api))
        })
    }

    pub fn with_toolkits(mut self, toolkits: ToolkitRegistry) -> Self {
        self.toolkits = Arc::new(toolkits);
        self
    }

    pub fn with_drafts(mut self, drafts: DraftStore) -> Self {
        self.drafts = Some(drafts);
        self
    }

    pub fn with_message_cache(mut self, cache: Arc<MessageCache>) -> Self {
        self.message_cache = Some(cache);
        self
    }
}

pub struct ChatSession;

impl ChatSession {
    /// Start the session actor. Must be called from within a Tokio runtime.
    pub fn spawn(config: ChatSessionConfig, deps: ChatSessionDeps) -> ChatSessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let chat_id = config.chat_id;
        let throttle = config.stream_throttle;

        let mut state = config.into_state();
        if let Some(drafts) = &deps.drafts {
            match drafts.load(chat_id) {
                Ok(draft) => state.input = draft,
                Err(e) => tracing::warn!(chat_id = %chat_id, error = %e, "Failed to load draft"),
            }
        }

        let actor = ChatSessionActor::new(state, &deps, throttle);
        tokio::spawn(actor.run(cmd_rx));

        ChatSessionHandle {
            chat_id,
            cmd_tx,
            toolkits: deps.toolkits,
            upload_api: deps.upload_api,
        }
    }
}

#[derive(Clone)]
pub struct ChatSessionHandle {
    chat_id: ChatId,
    cmd_tx: mpsc::Sender<SessionCmd>,
    toolkits: Arc<ToolkitRegistry>,
    upload_api: Arc<dyn UploadApi>,
}

impl ChatSessionHandle {
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub async fn dispatch(&self, action: Action) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Dispatch {
                action: Box::new(action),
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<ChatEvent>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::Subscribe { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    pub async fn state(&self) -> Result<ChatState, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCmd::GetState { reply: reply_tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    pub async fn set_input(&self, input: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Action::SetInput {
            input: input.into(),
        })
        .await
    }

    pub async fn select_model(&self, model: LanguageModel) -> Result<(), SessionError> {
        self.dispatch(Action::SelectModel { model }).await
    }

    pub async fn select_image_model(&self, model: Option<ImageModel>) -> Result<(), SessionError> {
        self.dispatch(Action::SelectImageModel { model }).await
    }

    pub async fn set_native_search(&self, enabled: bool) -> Result<(), SessionError> {
        self.dispatch(Action::SetNativeSearch { enabled }).await
    }

    /// Validate `parameters` against the toolkit's schema, then enable it.
    pub async fn add_toolkit(
        &self,
        id: impl Into<ToolkitId>,
        parameters: Value,
    ) -> Result<(), SessionError> {
        let id = id.into();
        let parameters = self.toolkits.validate(&id, &parameters)?;
        self.dispatch(Action::AddToolkit {
            binding: ToolkitBinding { id, parameters },
        })
        .await
    }

    pub async fn remove_toolkit(&self, id: impl Into<ToolkitId>) -> Result<(), SessionError> {
        self.dispatch(Action::RemoveToolkit { id: id.into() }).await
    }

    /// Upload files concurrently and attach the ones that succeed.
    pub async fn upload_files(&self, files: Vec<UploadFile>) -> Result<UploadOutcome, SessionError> {
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
        self.dispatch(Action::UploadsStarted {
            names: names.clone(),
        })
        .await?;

        let outcome = upload_all(self.upload_api.as_ref(), files).await;
        self.dispatch(Action::UploadsFinished {
            names,
            attachments: outcome.attachments.clone(),
            failures: outcome
                .failures
                .iter()
                .map(|f| f.error.user_message().to_string())
                .collect(),
        })
        .await?;
        Ok(outcome)
    }

    pub async fn remove_attachment(&self, url: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Action::RemoveAttachment { url: url.into() })
            .await
    }

    /// Send the current input. Returns the id of the started operation.
    pub async fn submit(&self) -> Result<OpId, SessionError> {
        let op_id = OpId::new();
        self.dispatch(Action::Submit {
            op_id,
            message_id: MessageId::new(),
            timestamp: Utc::now(),
        })
        .await?;
        Ok(op_id)
    }

    /// Regenerate the reply to the last user message.
    pub async fn reload(&self) -> Result<OpId, SessionError> {
        let op_id = OpId::new();
        self.dispatch(Action::Reload { op_id }).await?;
        Ok(op_id)
    }

    pub async fn resume(&self) -> Result<OpId, SessionError> {
        let op_id = OpId::new();
        self.dispatch(Action::Resume { op_id }).await?;
        Ok(op_id)
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.dispatch(Action::Stop).await
    }

    pub async fn set_messages(&self, messages: Vec<UiMessage>) -> Result<(), SessionError> {
        self.dispatch(Action::SetMessages { messages }).await
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.try_send(SessionCmd::Shutdown);
    }
}

struct ChatSessionActor {
    state: ChatState,
    interpreter: EffectInterpreter,
    drafts: Option<DraftStore>,
    message_cache: Option<Arc<MessageCache>>,
    active_operations: HashMap<OpId, CancellationToken>,
    event_broadcast: broadcast::Sender<ChatEvent>,
    internal_action_tx: mpsc::Sender<Action>,
    internal_action_rx: mpsc::Receiver<Action>,
    throttle: Duration,
    pending_update: Option<UiMessage>,
    last_update: Option<Instant>,
}

impl ChatSessionActor {
    fn new(state: ChatState, deps: &ChatSessionDeps, throttle: Duration) -> Self {
        let (event_broadcast, _) = broadcast::channel(EVENT_BROADCAST_CAPACITY);
        let (internal_action_tx, internal_action_rx) = mpsc::channel(INTERNAL_ACTION_CAPACITY);

        Self {
            state,
            interpreter: EffectInterpreter::new(deps.chat_api.clone()),
            drafts: deps.drafts.clone(),
            message_cache: deps.message_cache.clone(),
            active_operations: HashMap::new(),
            event_broadcast,
            internal_action_tx,
            internal_action_rx,
            throttle,
            pending_update: None,
            last_update: None,
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCmd>) {
        self.resume_on_start().await;

        loop {
            let flush_at = self.flush_deadline();
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        self.cancel_all_operations();
                        break;
                    };
                    match cmd {
                        SessionCmd::Dispatch { action, reply } => {
                            let result = self.handle_action(*action).await;
                            if let Err(SessionError::InvalidInput { message, .. }) = &result {
                                self.publish(ChatEvent::Notice {
                                    message: message.clone(),
                                });
                            }
                            let _ = reply.send(result);
                        }
                        SessionCmd::Subscribe { reply } => {
                            let _ = reply.send(self.event_broadcast.subscribe());
                        }
                        SessionCmd::GetState { reply } => {
                            let _ = reply.send(self.state.clone());
                        }
                        SessionCmd::Shutdown => {
                            self.cancel_all_operations();
                            self.flush_pending_update();
                            break;
                        }
                    }
                }

                Some(action) = self.internal_action_rx.recv() => {
                    if let Err(e) = self.handle_action(action).await {
                        tracing::error!(
                            chat_id = %self.state.chat_id,
                            error = %e,
                            "Failed to handle internal action"
                        );
                    }
                }

                () = tokio::time::sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                    self.flush_pending_update();
                }
            }
        }

        tracing::debug!(chat_id = %self.state.chat_id, "Chat session stopped");
    }

    async fn resume_on_start(&mut self) {
        if !self.state.auto_resume || !self.state.last_message().is_some_and(UiMessage::is_user) {
            return;
        }
        if let Err(e) = self.handle_action(Action::Resume { op_id: OpId::new() }).await {
            tracing::debug!(chat_id = %self.state.chat_id, error = %e, "Auto-resume skipped");
        }
    }

    async fn handle_action(&mut self, action: Action) -> Result<(), SessionError> {
        let effects = reduce(&mut self.state, action).map_err(|err| match err {
            ReduceError::InvalidAction { message, kind } => {
                SessionError::InvalidInput { message, kind }
            }
            ReduceError::Invariant { message } => SessionError::ReduceError { message },
        })?;

        for effect in effects {
            self.handle_effect(effect).await;
        }
        self.release_finished_operations();

        Ok(())
    }

    async fn handle_effect(&mut self, effect: Effect) {
        match effect {
            Effect::EmitEvent { event } => self.publish(event),

            Effect::Notify { message } => self.publish(ChatEvent::Notice { message }),

            Effect::CallModel { op_id, body } => {
                let cancel_token = self.active_operations.entry(op_id).or_default().clone();
                let interpreter = self.interpreter.clone();
                let action_tx = self.internal_action_tx.clone();

                tokio::spawn(async move {
                    interpreter
                        .stream_reply(op_id, *body, cancel_token, action_tx)
                        .await;
                });
            }

            Effect::ResumeStream { op_id, chat_id } => {
                let cancel_token = self.active_operations.entry(op_id).or_default().clone();
                let interpreter = self.interpreter.clone();
                let action_tx = self.internal_action_tx.clone();

                tokio::spawn(async move {
                    interpreter
                        .resume_stream(op_id, chat_id, cancel_token, action_tx)
                        .await;
                });
            }

            Effect::CancelOperation { op_id } => {
                if let Some(token) = self.active_operations.remove(&op_id) {
                    token.cancel();
                }
            }

            Effect::PersistDraft { input } => {
                if let Some(drafts) = &self.drafts
                    && let Err(e) = drafts.save(self.state.chat_id, &input)
                {
                    tracing::warn!(chat_id = %self.state.chat_id, error = %e, "Failed to save draft");
                }
            }

            Effect::InvalidateHistory { chat_id } => {
                if let Some(cache) = &self.message_cache {
                    cache.invalidate(chat_id).await;
                }
            }
        }
    }

    fn publish(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::MessageUpdated { message } if !self.throttle.is_zero() => {
                self.publish_update(message);
            }
            event => {
                self.flush_pending_update();
                let _ = self.event_broadcast.send(event);
            }
        }
    }

    fn publish_update(&mut self, message: UiMessage) {
        if self
            .pending_update
            .as_ref()
            .is_some_and(|pending| pending.id != message.id)
        {
            self.flush_pending_update();
        }

        let due = self
            .last_update
            .is_none_or(|at| at.elapsed() >= self.throttle);
        if due {
            self.pending_update = None;
            self.last_update = Some(Instant::now());
            let _ = self
                .event_broadcast
                .send(ChatEvent::MessageUpdated { message });
        } else {
            self.pending_update = Some(message);
        }
    }

    /// Earliest instant the pending update can go out without closing the gap
    /// to the previous one.
    fn flush_deadline(&self) -> Option<Instant> {
        self.pending_update.as_ref()?;
        Some(
            self.last_update
                .map_or_else(Instant::now, |at| at + self.throttle),
        )
    }

    fn flush_pending_update(&mut self) {
        if let Some(message) = self.pending_update.take() {
            self.last_update = Some(Instant::now());
            let _ = self
                .event_broadcast
                .send(ChatEvent::MessageUpdated { message });
        }
    }

    /// Drop tokens of ops the reducer no longer tracks.
    fn release_finished_operations(&mut self) {
        let current = self.state.current_op;
        self.active_operations.retain(|op_id, token| {
            let keep = current == Some(*op_id);
            if !keep {
                token.cancel();
            }
            keep
        });
    }

    fn cancel_all_operations(&mut self) {
        for (_, token) in self.active_operations.drain() {
            token.cancel();
        }
    }
}
