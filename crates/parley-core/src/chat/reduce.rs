use chrono::{DateTime, Utc};
use parley_toolkits::ToolkitId;
use tracing::{debug, warn};

use crate::api::error::GENERIC_ERROR_MESSAGE;
use crate::api::request::ChatRequestBody;
use crate::api::stream::{DataPart, StreamPart};
use crate::config::model::{ImageModel, LanguageModel, LanguageModelCapability};

use super::action::{Action, StreamFailure};
use super::attachment::Attachment;
use super::effect::Effect;
use super::event::ChatEvent;
use super::gating::SubmitBlocker;
use super::message::UiMessage;
use super::state::ChatState;
use super::toolkits::ToolkitBinding;
use super::types::{ChatStatus, MessageId, OpId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidActionKind {
    Readonly,
    Busy,
    Blocked(SubmitBlocker),
    EmptyInput,
    UploadsPending,
    AttachmentsDisabled,
    NativeSearchUnsupported,
    NothingToReload,
    NothingToResume,
    ResumeDisabled,
}

impl InvalidActionKind {
    pub fn message(self) -> &'static str {
        match self {
            InvalidActionKind::Readonly => "This chat is read-only",
            InvalidActionKind::Busy => "Please wait for the model to finish its response!",
            InvalidActionKind::Blocked(blocker) => blocker.message(),
            InvalidActionKind::EmptyInput => "Please enter a message",
            InvalidActionKind::UploadsPending => "Please wait for your uploads to finish",
            InvalidActionKind::AttachmentsDisabled => super::gating::ATTACHMENTS_DISABLED_MESSAGE,
            InvalidActionKind::NativeSearchUnsupported => {
                "The selected model does not support native search"
            }
            InvalidActionKind::NothingToReload => "There is no message to regenerate",
            InvalidActionKind::NothingToResume => "There is no response to resume",
            InvalidActionKind::ResumeDisabled => "Resuming streams is disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error("{message}")]
    InvalidAction {
        message: String,
        kind: InvalidActionKind,
    },

    #[error("Invariant violated: {message}")]
    Invariant { message: String },
}

fn invalid(kind: InvalidActionKind) -> ReduceError {
    ReduceError::InvalidAction {
        message: kind.message().to_string(),
        kind,
    }
}

fn emit(event: ChatEvent) -> Effect {
    Effect::EmitEvent { event }
}

pub fn reduce(state: &mut ChatState, action: Action) -> Result<Vec<Effect>, ReduceError> {
    match action {
        Action::SetInput { input } => {
            state.input = input.clone();
            Ok(vec![Effect::PersistDraft { input }])
        }

        Action::SelectModel { model } => Ok(handle_select_model(state, model)),

        Action::SetNativeSearch { enabled } => handle_set_native_search(state, enabled),

        Action::SelectImageModel { model } => Ok(handle_select_image_model(state, model)),

        Action::AddToolkit { binding } => Ok(handle_add_toolkit(state, binding)),

        Action::RemoveToolkit { id } => Ok(handle_remove_toolkit(state, &id)),

        Action::UploadsStarted { names } => handle_uploads_started(state, names),

        Action::UploadsFinished {
            names,
            attachments,
            failures,
        } => Ok(handle_uploads_finished(state, &names, attachments, failures)),

        Action::RemoveAttachment { url } => {
            let before = state.attachments.len();
            state.attachments.retain(|a| a.url != url);
            if state.attachments.len() == before {
                return Ok(vec![]);
            }
            Ok(vec![attachments_changed(state)])
        }

        Action::Submit {
            op_id,
            message_id,
            timestamp,
        } => handle_submit(state, op_id, message_id, timestamp),

        Action::Reload { op_id } => handle_reload(state, op_id),

        Action::StreamPart {
            op_id,
            part,
            received_at,
        } => Ok(handle_stream_part(state, op_id, part, received_at)),

        Action::StreamFinished { op_id } => Ok(handle_stream_finished(state, op_id)),

        Action::StreamFailed { op_id, failure } => Ok(handle_stream_failed(state, op_id, failure)),

        Action::Stop => Ok(handle_stop(state)),

        Action::Resume { op_id } => handle_resume(state, op_id),

        Action::ResumeUnavailable { op_id } => {
            if !state.is_current_op(op_id) {
                return Ok(vec![]);
            }
            debug!(chat_id = %state.chat_id, "No active stream to resume");
            finish_operation(state);
            Ok(vec![status_changed(state, ChatStatus::Idle)])
        }

        Action::SetMessages { messages } => {
            if state.status.is_busy() {
                return Err(invalid(InvalidActionKind::Busy));
            }
            state.messages = messages.clone();
            Ok(vec![emit(ChatEvent::MessagesReplaced { messages })])
        }
    }
}

fn handle_select_model(state: &mut ChatState, model: LanguageModel) -> Vec<Effect> {
    // Search follows the model's capability on every switch.
    state.use_native_search = model.has_capability(LanguageModelCapability::WebSearch);
    state.selected_model = Some(model);
    vec![selection_changed(state)]
}

fn handle_set_native_search(
    state: &mut ChatState,
    enabled: bool,
) -> Result<Vec<Effect>, ReduceError> {
    let supported = state
        .selected_model
        .as_ref()
        .is_some_and(|m| m.has_capability(LanguageModelCapability::WebSearch));
    if enabled && !supported {
        return Err(invalid(InvalidActionKind::NativeSearchUnsupported));
    }
    state.use_native_search = enabled;
    Ok(vec![selection_changed(state)])
}

fn handle_select_image_model(state: &mut ChatState, model: Option<ImageModel>) -> Vec<Effect> {
    state.image_model = model;
    vec![selection_changed(state)]
}

fn handle_add_toolkit(state: &mut ChatState, binding: ToolkitBinding) -> Vec<Effect> {
    state.toolkits.add(binding);
    vec![toolkits_changed(state)]
}

fn handle_remove_toolkit(state: &mut ChatState, id: &ToolkitId) -> Vec<Effect> {
    if state.toolkits.remove(id) {
        vec![toolkits_changed(state)]
    } else {
        vec![]
    }
}

fn handle_uploads_started(
    state: &mut ChatState,
    names: Vec<String>,
) -> Result<Vec<Effect>, ReduceError> {
    if state.readonly {
        return Err(invalid(InvalidActionKind::Readonly));
    }
    if state.status != ChatStatus::Idle {
        return Err(invalid(InvalidActionKind::Busy));
    }
    if state.gate().accepted_file_types().is_empty() {
        return Err(invalid(InvalidActionKind::AttachmentsDisabled));
    }
    state.upload_queue.extend(names);
    Ok(vec![attachments_changed(state)])
}

fn handle_uploads_finished(
    state: &mut ChatState,
    names: &[String],
    attachments: Vec<Attachment>,
    failures: Vec<String>,
) -> Vec<Effect> {
    // Other batches may still be in flight; drop only this batch's entries.
    for name in names {
        if let Some(index) = state.upload_queue.iter().position(|queued| queued == name) {
            state.upload_queue.remove(index);
        }
    }
    state.attachments.extend(attachments);

    let mut effects = vec![attachments_changed(state)];
    effects.extend(
        failures
            .into_iter()
            .map(|message| Effect::Notify { message }),
    );
    effects
}

fn check_can_request(state: &ChatState) -> Result<(), ReduceError> {
    if state.readonly {
        return Err(invalid(InvalidActionKind::Readonly));
    }
    if state.status.is_busy() {
        return Err(invalid(InvalidActionKind::Busy));
    }
    Ok(())
}

fn handle_submit(
    state: &mut ChatState,
    op_id: OpId,
    message_id: MessageId,
    timestamp: DateTime<Utc>,
) -> Result<Vec<Effect>, ReduceError> {
    check_can_request(state)?;
    if let Some(blocker) = state.gate().submit_blocker() {
        return Err(invalid(InvalidActionKind::Blocked(blocker)));
    }
    if state.input.trim().is_empty() {
        return Err(invalid(InvalidActionKind::EmptyInput));
    }
    if !state.upload_queue.is_empty() {
        return Err(invalid(InvalidActionKind::UploadsPending));
    }

    let attachments = std::mem::take(&mut state.attachments);
    let had_attachments = !attachments.is_empty();
    let text = std::mem::take(&mut state.input);
    let message = UiMessage::user(message_id, text, attachments, timestamp);
    state.messages.push(message.clone());

    let body = request_body(state, message.clone())?;
    begin_operation(state, op_id);

    let mut effects = vec![
        emit(ChatEvent::MessageAppended { message }),
        status_changed(state, ChatStatus::Submitted),
    ];
    if had_attachments {
        effects.push(attachments_changed(state));
    }
    effects.push(Effect::PersistDraft {
        input: String::new(),
    });
    effects.push(Effect::CallModel {
        op_id,
        body: Box::new(body),
    });
    Ok(effects)
}

fn handle_reload(state: &mut ChatState, op_id: OpId) -> Result<Vec<Effect>, ReduceError> {
    check_can_request(state)?;
    if state.selected_model.is_none() {
        return Err(invalid(InvalidActionKind::Blocked(SubmitBlocker::NoModel)));
    }

    let Some(user_index) = state.messages.iter().rposition(UiMessage::is_user) else {
        return Err(invalid(InvalidActionKind::NothingToReload));
    };

    let mut effects = Vec::new();
    if state.messages.len() > user_index + 1 {
        state.messages.truncate(user_index + 1);
        effects.push(emit(ChatEvent::MessagesReplaced {
            messages: state.messages.clone(),
        }));
    }

    let message = state.messages[user_index].clone();
    let body = request_body(state, message)?;
    begin_operation(state, op_id);

    effects.push(status_changed(state, ChatStatus::Submitted));
    effects.push(Effect::CallModel {
        op_id,
        body: Box::new(body),
    });
    Ok(effects)
}

fn handle_resume(state: &mut ChatState, op_id: OpId) -> Result<Vec<Effect>, ReduceError> {
    if !state.auto_resume {
        return Err(invalid(InvalidActionKind::ResumeDisabled));
    }
    if state.status.is_busy() {
        return Err(invalid(InvalidActionKind::Busy));
    }
    if !state.last_message().is_some_and(UiMessage::is_user) {
        return Err(invalid(InvalidActionKind::NothingToResume));
    }

    begin_operation(state, op_id);
    Ok(vec![
        status_changed(state, ChatStatus::Submitted),
        Effect::ResumeStream {
            op_id,
            chat_id: state.chat_id,
        },
    ])
}

fn handle_stream_part(
    state: &mut ChatState,
    op_id: OpId,
    part: StreamPart,
    received_at: DateTime<Utc>,
) -> Vec<Effect> {
    if !state.is_current_op(op_id) {
        debug!(op_id = %op_id, "Ignoring stream part for stale operation");
        return vec![];
    }

    match part {
        StreamPart::Start { message_id } => {
            state.announced_message = message_id;
            vec![]
        }
        StreamPart::TextDelta { delta } => {
            apply_to_assistant(state, received_at, |m| m.push_text_delta(&delta))
        }
        StreamPart::ReasoningDelta { delta } => {
            apply_to_assistant(state, received_at, |m| m.push_reasoning_delta(&delta))
        }
        StreamPart::ToolCall {
            tool_call_id,
            tool_name,
            args,
        } => apply_to_assistant(state, received_at, |m| {
            m.push_tool_call(tool_call_id, tool_name, args)
        }),
        StreamPart::ToolResult {
            tool_call_id,
            result,
        } => {
            let Some(id) = state.streaming_message.clone() else {
                debug!(tool_call_id, "Tool result before any assistant output");
                return vec![];
            };
            let Some(message) = state.message_mut(&id) else {
                return vec![];
            };
            if !message.set_tool_result(&tool_call_id, result) {
                debug!(tool_call_id, "Tool result for unknown invocation");
                return vec![];
            }
            let message = message.clone();
            vec![emit(ChatEvent::MessageUpdated { message })]
        }
        StreamPart::Data {
            data: DataPart::AppendMessage { message },
        } => handle_append_message(state, &message),
        StreamPart::Data {
            data: DataPart::Other,
        } => vec![],
        StreamPart::Error { error_text } => {
            warn!(op_id = %op_id, error = %error_text, "Chat stream reported an error");
            let mut effects = handle_stream_failed(
                state,
                op_id,
                StreamFailure {
                    user_message: GENERIC_ERROR_MESSAGE.to_string(),
                    detail: error_text,
                },
            );
            effects.push(Effect::CancelOperation { op_id });
            effects
        }
        StreamPart::Finish { finish_reason } => {
            debug!(op_id = %op_id, ?finish_reason, "Model finished");
            vec![]
        }
    }
}

/// Apply output to the assistant message of the current op, creating it on first content.
fn apply_to_assistant(
    state: &mut ChatState,
    received_at: DateTime<Utc>,
    apply: impl FnOnce(&mut UiMessage),
) -> Vec<Effect> {
    let mut effects = Vec::new();
    if state.status == ChatStatus::Submitted {
        effects.push(status_changed(state, ChatStatus::Streaming));
    }

    let existing = state
        .streaming_message
        .clone()
        .and_then(|id| state.messages.iter().position(|m| m.id == id));

    match existing {
        Some(index) => {
            let message = &mut state.messages[index];
            apply(message);
            effects.push(emit(ChatEvent::MessageUpdated {
                message: message.clone(),
            }));
        }
        None => {
            let id = state
                .announced_message
                .take()
                .unwrap_or_else(MessageId::new);
            let mut message = UiMessage::assistant(id.clone(), received_at);
            apply(&mut message);
            state.messages.push(message.clone());
            state.streaming_message = Some(id);
            effects.push(emit(ChatEvent::MessageAppended { message }));
        }
    }
    effects
}

fn handle_append_message(state: &mut ChatState, raw: &str) -> Vec<Effect> {
    let message: UiMessage = match serde_json::from_str(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed append-message payload");
            return vec![];
        }
    };

    let mut effects = Vec::new();
    if message.is_assistant() {
        state.streaming_message = Some(message.id.clone());
        if state.status == ChatStatus::Submitted {
            effects.push(status_changed(state, ChatStatus::Streaming));
        }
    }

    match state.message_mut(&message.id) {
        Some(existing) => {
            *existing = message.clone();
            effects.push(emit(ChatEvent::MessageUpdated { message }));
        }
        None => {
            state.messages.push(message.clone());
            effects.push(emit(ChatEvent::MessageAppended { message }));
        }
    }
    effects
}

fn handle_stream_finished(state: &mut ChatState, op_id: OpId) -> Vec<Effect> {
    if !state.is_current_op(op_id) {
        return vec![];
    }
    finish_operation(state);
    vec![
        status_changed(state, ChatStatus::Idle),
        emit(ChatEvent::StreamFinished { op_id }),
        Effect::InvalidateHistory {
            chat_id: state.chat_id,
        },
    ]
}

fn handle_stream_failed(state: &mut ChatState, op_id: OpId, failure: StreamFailure) -> Vec<Effect> {
    if !state.is_current_op(op_id) {
        return vec![];
    }
    debug!(op_id = %op_id, detail = %failure.detail, "Chat stream failed");
    finish_operation(state);
    state.error = Some(failure.user_message.clone());
    vec![
        status_changed(state, ChatStatus::Error),
        emit(ChatEvent::StreamFailed {
            op_id,
            message: failure.user_message.clone(),
        }),
        Effect::Notify {
            message: failure.user_message,
        },
    ]
}

fn handle_stop(state: &mut ChatState) -> Vec<Effect> {
    let Some(op_id) = state.current_op else {
        return vec![];
    };
    finish_operation(state);
    vec![
        Effect::CancelOperation { op_id },
        status_changed(state, ChatStatus::Idle),
    ]
}

fn begin_operation(state: &mut ChatState, op_id: OpId) {
    state.current_op = Some(op_id);
    state.streaming_message = None;
    state.announced_message = None;
    state.error = None;
}

fn finish_operation(state: &mut ChatState) {
    state.current_op = None;
    state.streaming_message = None;
    state.announced_message = None;
}

fn request_body(state: &ChatState, message: UiMessage) -> Result<ChatRequestBody, ReduceError> {
    let model = state
        .selected_model
        .as_ref()
        .ok_or_else(|| ReduceError::Invariant {
            message: "request built without a selected model".to_string(),
        })?;

    Ok(ChatRequestBody {
        id: state.chat_id,
        message,
        selected_chat_model: model.id(),
        image_generation_model: state.image_model.as_ref().map(ImageModel::id),
        selected_visibility_type: state.visibility,
        use_native_search: state.use_native_search,
        toolkits: state.toolkits.as_slice().to_vec(),
    })
}

fn status_changed(state: &mut ChatState, status: ChatStatus) -> Effect {
    state.status = status;
    emit(ChatEvent::StatusChanged { status })
}

fn attachments_changed(state: &ChatState) -> Effect {
    emit(ChatEvent::AttachmentsChanged {
        attachments: state.attachments.clone(),
        upload_queue: state.upload_queue.clone(),
    })
}

fn selection_changed(state: &ChatState) -> Effect {
    emit(ChatEvent::SelectionChanged {
        model: state.selected_model.as_ref().map(LanguageModel::id),
        image_model: state.image_model.as_ref().map(ImageModel::id),
        use_native_search: state.use_native_search,
    })
}

fn toolkits_changed(state: &ChatState) -> Effect {
    emit(ChatEvent::ToolkitsChanged {
        toolkits: state.toolkits.as_slice().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::{ChatId, Visibility};
    use proptest::prelude::*;
    use serde_json::json;

    fn model(capabilities: &[LanguageModelCapability]) -> LanguageModel {
        LanguageModel {
            provider: "openai".to_string(),
            model_id: "gpt-4o".to_string(),
            name: "GPT-4o".to_string(),
            capabilities: capabilities.to_vec(),
            aliases: vec![],
        }
    }

    fn ready_state() -> ChatState {
        let mut state = ChatState::new(ChatId::new(), Visibility::Private);
        state.selected_model = Some(model(&[LanguageModelCapability::Vision]));
        state.input = "Hello".to_string();
        state
    }

    fn submit(state: &mut ChatState) -> (OpId, Result<Vec<Effect>, ReduceError>) {
        let op_id = OpId::new();
        let result = reduce(
            state,
            Action::Submit {
                op_id,
                message_id: MessageId::from("user-1"),
                timestamp: Utc::now(),
            },
        );
        (op_id, result)
    }

    fn part(state: &mut ChatState, op_id: OpId, part: StreamPart) -> Vec<Effect> {
        reduce(
            state,
            Action::StreamPart {
                op_id,
                part,
                received_at: Utc::now(),
            },
        )
        .unwrap()
    }

    fn text(delta: &str) -> StreamPart {
        StreamPart::TextDelta {
            delta: delta.to_string(),
        }
    }

    fn image() -> Attachment {
        Attachment {
            url: "https://blob.example.com/cat.png".to_string(),
            name: "cat.png".to_string(),
            content_type: "image/png".to_string(),
        }
    }

    fn kind_of(err: ReduceError) -> InvalidActionKind {
        match err {
            ReduceError::InvalidAction { kind, .. } => kind,
            other => panic!("expected invalid action, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_starts_request() {
        let mut state = ready_state();
        state.attachments.push(image());

        let (op_id, result) = submit(&mut state);
        let effects = result.unwrap();

        assert_eq!(state.status, ChatStatus::Submitted);
        assert_eq!(state.current_op, Some(op_id));
        assert!(state.input.is_empty());
        assert!(state.attachments.is_empty());
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].attachments.len(), 1);

        let body = effects
            .iter()
            .find_map(|e| match e {
                Effect::CallModel { body, .. } => Some(body),
                _ => None,
            })
            .expect("call model effect");
        assert_eq!(body.selected_chat_model.to_string(), "openai:gpt-4o");
        assert_eq!(body.message.content, "Hello");
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::PersistDraft { input } if input.is_empty()))
        );
    }

    #[test]
    fn test_submit_rejections() {
        let mut state = ready_state();
        state.selected_model = None;
        assert_eq!(
            kind_of(submit(&mut state).1.unwrap_err()),
            InvalidActionKind::Blocked(SubmitBlocker::NoModel)
        );

        let mut state = ready_state();
        state.selected_model = Some(model(&[]));
        state.attachments.push(image());
        assert_eq!(
            kind_of(submit(&mut state).1.unwrap_err()),
            InvalidActionKind::Blocked(SubmitBlocker::UnsupportedAttachments)
        );

        let mut state = ready_state();
        state.input = "   ".to_string();
        assert_eq!(
            kind_of(submit(&mut state).1.unwrap_err()),
            InvalidActionKind::EmptyInput
        );

        let mut state = ready_state();
        state.upload_queue.push("big.pdf".to_string());
        assert_eq!(
            kind_of(submit(&mut state).1.unwrap_err()),
            InvalidActionKind::UploadsPending
        );

        let mut state = ready_state();
        state.readonly = true;
        assert_eq!(
            kind_of(submit(&mut state).1.unwrap_err()),
            InvalidActionKind::Readonly
        );
    }

    #[test]
    fn test_submit_while_busy_is_rejected_without_mutation() {
        let mut state = ready_state();
        let _ = submit(&mut state).1.unwrap();
        state.input = "again".to_string();

        let err = submit(&mut state).1.unwrap_err();
        assert_eq!(kind_of(err.clone()), InvalidActionKind::Busy);
        assert_eq!(
            err.to_string(),
            "Please wait for the model to finish its response!"
        );
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.input, "again");
    }

    #[test]
    fn test_submit_allowed_after_error() {
        let mut state = ready_state();
        let (op_id, _) = submit(&mut state);
        reduce(
            &mut state,
            Action::StreamFailed {
                op_id,
                failure: StreamFailure {
                    user_message: "boom".to_string(),
                    detail: "boom".to_string(),
                },
            },
        )
        .unwrap();
        assert_eq!(state.status, ChatStatus::Error);

        state.input = "retry".to_string();
        assert!(submit(&mut state).1.is_ok());
        assert_eq!(state.status, ChatStatus::Submitted);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_streaming_builds_assistant_message() {
        let mut state = ready_state();
        let (op_id, _) = submit(&mut state);

        part(
            &mut state,
            op_id,
            StreamPart::Start {
                message_id: Some(MessageId::from("assistant-1")),
            },
        );
        assert_eq!(state.status, ChatStatus::Submitted);

        let effects = part(&mut state, op_id, text("Hel"));
        assert_eq!(state.status, ChatStatus::Streaming);
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::EmitEvent {
                event: ChatEvent::MessageAppended { .. }
            }
        )));

        let effects = part(&mut state, op_id, text("lo"));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::EmitEvent {
                event: ChatEvent::MessageUpdated { .. }
            }
        )));

        part(
            &mut state,
            op_id,
            StreamPart::ToolCall {
                tool_call_id: "tc1".to_string(),
                tool_name: "get-playlists".to_string(),
                args: json!({ "limit": 5 }),
            },
        );
        part(
            &mut state,
            op_id,
            StreamPart::ToolResult {
                tool_call_id: "tc1".to_string(),
                result: json!({ "items": [] }),
            },
        );

        let effects = reduce(&mut state, Action::StreamFinished { op_id }).unwrap();
        assert_eq!(state.status, ChatStatus::Idle);
        assert!(state.current_op.is_none());
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::InvalidateHistory { .. }))
        );

        let assistant = &state.messages[1];
        assert_eq!(assistant.id.as_str(), "assistant-1");
        assert_eq!(assistant.content, "Hello");
        assert_eq!(assistant.parts.len(), 2);
    }

    #[test]
    fn test_stream_error_part_fails_with_generic_message() {
        let mut state = ready_state();
        let (op_id, _) = submit(&mut state);

        let effects = part(
            &mut state,
            op_id,
            StreamPart::Error {
                error_text: "rate limited upstream".to_string(),
            },
        );

        assert_eq!(state.status, ChatStatus::Error);
        assert_eq!(state.error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::CancelOperation { op_id: id } if *id == op_id))
        );
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::Notify { message } if message == GENERIC_ERROR_MESSAGE))
        );

        // The reader task reports the end of the stream afterwards.
        let effects = reduce(&mut state, Action::StreamFinished { op_id }).unwrap();
        assert!(effects.is_empty());
        assert_eq!(state.status, ChatStatus::Error);
    }

    #[test]
    fn test_late_parts_ignored_after_stop() {
        let mut state = ready_state();
        let (op_id, _) = submit(&mut state);
        part(&mut state, op_id, text("partial"));

        let effects = reduce(&mut state, Action::Stop).unwrap();
        assert!(matches!(effects[0], Effect::CancelOperation { .. }));
        assert_eq!(state.status, ChatStatus::Idle);

        assert!(part(&mut state, op_id, text(" more")).is_empty());
        assert_eq!(state.messages[1].content, "partial");
        assert!(reduce(&mut state, Action::Stop).unwrap().is_empty());
    }

    #[test]
    fn test_append_message_replaces_existing_id() {
        let mut state = ready_state();
        state.auto_resume = true;
        state.messages.push(UiMessage::user(
            MessageId::from("u1"),
            "hi",
            vec![],
            Utc::now(),
        ));
        let op_id = OpId::new();
        reduce(&mut state, Action::Resume { op_id }).unwrap();

        let mut assistant = UiMessage::assistant(MessageId::from("a1"), Utc::now());
        assistant.push_text_delta("first");
        let payload = serde_json::to_string(&assistant).unwrap();
        part(
            &mut state,
            op_id,
            StreamPart::Data {
                data: DataPart::AppendMessage { message: payload },
            },
        );
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.status, ChatStatus::Streaming);

        assistant.push_text_delta(" and more");
        let payload = serde_json::to_string(&assistant).unwrap();
        part(
            &mut state,
            op_id,
            StreamPart::Data {
                data: DataPart::AppendMessage { message: payload },
            },
        );
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, "first and more");

        part(
            &mut state,
            op_id,
            StreamPart::Data {
                data: DataPart::AppendMessage {
                    message: "{not json".to_string(),
                },
            },
        );
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn test_resume_requires_trailing_user_message() {
        let mut state = ready_state();
        state.auto_resume = true;
        assert_eq!(
            kind_of(reduce(&mut state, Action::Resume { op_id: OpId::new() }).unwrap_err()),
            InvalidActionKind::NothingToResume
        );

        state.auto_resume = false;
        assert_eq!(
            kind_of(reduce(&mut state, Action::Resume { op_id: OpId::new() }).unwrap_err()),
            InvalidActionKind::ResumeDisabled
        );
    }

    #[test]
    fn test_resume_unavailable_returns_to_idle() {
        let mut state = ready_state();
        state.auto_resume = true;
        state.messages.push(UiMessage::user(
            MessageId::from("u1"),
            "hi",
            vec![],
            Utc::now(),
        ));
        let op_id = OpId::new();
        let effects = reduce(&mut state, Action::Resume { op_id }).unwrap();
        assert!(matches!(effects[1], Effect::ResumeStream { .. }));
        assert_eq!(state.status, ChatStatus::Submitted);

        reduce(&mut state, Action::ResumeUnavailable { op_id }).unwrap();
        assert_eq!(state.status, ChatStatus::Idle);
        assert!(state.current_op.is_none());
    }

    #[test]
    fn test_reload_drops_trailing_assistant_message() {
        let mut state = ready_state();
        let (op_id, _) = submit(&mut state);
        part(&mut state, op_id, text("old answer"));
        reduce(&mut state, Action::StreamFinished { op_id }).unwrap();
        assert_eq!(state.messages.len(), 2);

        let effects = reduce(&mut state, Action::Reload { op_id: OpId::new() }).unwrap();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.status, ChatStatus::Submitted);
        let body = effects
            .iter()
            .find_map(|e| match e {
                Effect::CallModel { body, .. } => Some(body),
                _ => None,
            })
            .expect("call model effect");
        assert_eq!(body.message.id.as_str(), "user-1");
    }

    #[test]
    fn test_reload_without_user_message() {
        let mut state = ready_state();
        assert_eq!(
            kind_of(reduce(&mut state, Action::Reload { op_id: OpId::new() }).unwrap_err()),
            InvalidActionKind::NothingToReload
        );
    }

    #[test]
    fn test_select_model_resets_native_search() {
        let mut state = ready_state();
        reduce(
            &mut state,
            Action::SelectModel {
                model: model(&[LanguageModelCapability::WebSearch]),
            },
        )
        .unwrap();
        assert!(state.use_native_search);

        reduce(&mut state, Action::SetNativeSearch { enabled: false }).unwrap();
        assert!(!state.use_native_search);

        reduce(
            &mut state,
            Action::SelectModel {
                model: model(&[LanguageModelCapability::Vision]),
            },
        )
        .unwrap();
        assert!(!state.use_native_search);
        assert_eq!(
            kind_of(reduce(&mut state, Action::SetNativeSearch { enabled: true }).unwrap_err()),
            InvalidActionKind::NativeSearchUnsupported
        );
    }

    #[test]
    fn test_uploads_round_trip_through_queue() {
        let mut state = ready_state();
        reduce(
            &mut state,
            Action::UploadsStarted {
                names: vec!["cat.png".to_string(), "bad.exe".to_string()],
            },
        )
        .unwrap();
        assert_eq!(state.upload_queue.len(), 2);
        assert!(!state.can_send());

        let effects = reduce(
            &mut state,
            Action::UploadsFinished {
                names: vec!["cat.png".to_string(), "bad.exe".to_string()],
                attachments: vec![image()],
                failures: vec!["File type should be JPEG or PNG".to_string()],
            },
        )
        .unwrap();
        assert!(state.upload_queue.is_empty());
        assert_eq!(state.attachments.len(), 1);
        assert!(effects.iter().any(|e| matches!(e, Effect::Notify { .. })));

        reduce(
            &mut state,
            Action::RemoveAttachment {
                url: image().url,
            },
        )
        .unwrap();
        assert!(state.attachments.is_empty());
    }

    #[test]
    fn test_overlapping_upload_batches_keep_queue_until_both_finish() {
        let mut state = ready_state();
        for name in ["a.png", "b.png"] {
            reduce(
                &mut state,
                Action::UploadsStarted {
                    names: vec![name.to_string()],
                },
            )
            .unwrap();
        }

        reduce(
            &mut state,
            Action::UploadsFinished {
                names: vec!["a.png".to_string()],
                attachments: vec![image()],
                failures: vec![],
            },
        )
        .unwrap();
        assert_eq!(state.upload_queue, vec!["b.png".to_string()]);
        assert!(!state.can_send());

        reduce(
            &mut state,
            Action::UploadsFinished {
                names: vec!["b.png".to_string()],
                attachments: vec![],
                failures: vec![],
            },
        )
        .unwrap();
        assert!(state.upload_queue.is_empty());
        assert!(state.can_send());
    }

    #[test]
    fn test_uploads_rejected_when_model_takes_no_files() {
        let mut state = ready_state();
        state.selected_model = Some(model(&[]));
        assert_eq!(
            kind_of(
                reduce(
                    &mut state,
                    Action::UploadsStarted {
                        names: vec!["cat.png".to_string()],
                    },
                )
                .unwrap_err()
            ),
            InvalidActionKind::AttachmentsDisabled
        );
    }

    #[test]
    fn test_toolkits_are_deduplicated() {
        let mut state = ready_state();
        let binding = |limit: u32| ToolkitBinding {
            id: ToolkitId::from("spotify"),
            parameters: json!({ "limit": limit }),
        };
        reduce(&mut state, Action::AddToolkit { binding: binding(1) }).unwrap();
        reduce(&mut state, Action::AddToolkit { binding: binding(2) }).unwrap();
        assert_eq!(state.toolkits.len(), 1);

        let (_, result) = submit(&mut state);
        let effects = result.unwrap();
        let body = effects
            .iter()
            .find_map(|e| match e {
                Effect::CallModel { body, .. } => Some(body),
                _ => None,
            })
            .expect("call model effect");
        assert_eq!(body.toolkits[0].parameters, json!({ "limit": 2 }));

        let effects = reduce(
            &mut state,
            Action::RemoveToolkit {
                id: ToolkitId::from("missing"),
            },
        )
        .unwrap();
        assert!(effects.is_empty());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Submit,
        Delta,
        Finish,
        Fail,
        Stop,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Submit),
            Just(Step::Delta),
            Just(Step::Finish),
            Just(Step::Fail),
            Just(Step::Stop),
        ]
    }

    proptest! {
        #[test]
        fn status_and_operation_stay_consistent(steps in proptest::collection::vec(step(), 0..40)) {
            let mut state = ready_state();
            let mut last_op = None;

            for step in steps {
                let op = state.current_op.or(last_op).unwrap_or_default();
                let _ = match step {
                    Step::Submit => {
                        state.input = "next".to_string();
                        let (op_id, result) = submit(&mut state);
                        if result.is_ok() {
                            last_op = Some(op_id);
                        }
                        result
                    }
                    Step::Delta => reduce(&mut state, Action::StreamPart {
                        op_id: op,
                        part: text("x"),
                        received_at: Utc::now(),
                    }),
                    Step::Finish => reduce(&mut state, Action::StreamFinished { op_id: op }),
                    Step::Fail => reduce(&mut state, Action::StreamFailed {
                        op_id: op,
                        failure: StreamFailure {
                            user_message: "x".to_string(),
                            detail: "x".to_string(),
                        },
                    }),
                    Step::Stop => reduce(&mut state, Action::Stop),
                };

                prop_assert_eq!(state.status.is_busy(), state.current_op.is_some());
                let assistants = state.messages.iter().filter(|m| m.is_assistant()).count();
                let users = state.messages.iter().filter(|m| m.is_user()).count();
                prop_assert!(assistants <= users);
            }
        }
    }
}
