use crate::config::model::{ImageModel, LanguageModel};

use super::attachment::Attachment;
use super::gating::CapabilityGate;
use super::message::UiMessage;
use super::toolkits::ToolkitBindings;
use super::types::{ChatId, ChatStatus, MessageId, OpId, Visibility};

#[derive(Debug, Clone)]
pub struct ChatState {
    pub chat_id: ChatId,
    pub visibility: Visibility,
    pub readonly: bool,
    pub auto_resume: bool,

    pub messages: Vec<UiMessage>,
    pub status: ChatStatus,

    pub input: String,
    pub attachments: Vec<Attachment>,
    /// Names of files currently uploading.
    pub upload_queue: Vec<String>,

    pub selected_model: Option<LanguageModel>,
    pub use_native_search: bool,
    pub image_model: Option<ImageModel>,
    pub toolkits: ToolkitBindings,

    pub current_op: Option<OpId>,
    /// Assistant message being built by the current op.
    pub streaming_message: Option<MessageId>,
    /// Id announced by a `start` part, used for the next assistant message.
    pub announced_message: Option<MessageId>,

    pub error: Option<String>,
}

impl ChatState {
    pub fn new(chat_id: ChatId, visibility: Visibility) -> Self {
        Self {
            chat_id,
            visibility,
            readonly: false,
            auto_resume: false,
            messages: Vec::new(),
            status: ChatStatus::Idle,
            input: String::new(),
            attachments: Vec::new(),
            upload_queue: Vec::new(),
            selected_model: None,
            use_native_search: false,
            image_model: None,
            toolkits: ToolkitBindings::new(),
            current_op: None,
            streaming_message: None,
            announced_message: None,
            error: None,
        }
    }

    pub fn with_messages(mut self, messages: Vec<UiMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn gate(&self) -> CapabilityGate {
        CapabilityGate::new(self.selected_model.as_ref(), &self.attachments)
    }

    pub fn can_send(&self) -> bool {
        !self.readonly
            && !self.status.is_busy()
            && self.gate().can_send(&self.input, self.upload_queue.len())
    }

    pub fn last_message(&self) -> Option<&UiMessage> {
        self.messages.last()
    }

    pub fn message(&self, id: &MessageId) -> Option<&UiMessage> {
        self.messages.iter().find(|m| m.id == *id)
    }

    pub(crate) fn message_mut(&mut self, id: &MessageId) -> Option<&mut UiMessage> {
        self.messages.iter_mut().find(|m| m.id == *id)
    }

    pub fn is_current_op(&self, op_id: OpId) -> bool {
        self.current_op == Some(op_id)
    }
}
