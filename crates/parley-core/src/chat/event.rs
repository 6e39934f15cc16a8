use serde::{Deserialize, Serialize};

use crate::config::model::ModelId;

use super::attachment::Attachment;
use super::message::UiMessage;
use super::toolkits::ToolkitBinding;
use super::types::{ChatStatus, OpId};

/// Changes broadcast to session subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatEvent {
    StatusChanged {
        status: ChatStatus,
    },

    MessageAppended {
        message: UiMessage,
    },

    /// In-place update of a streaming message. Delivered at most once per throttle interval.
    MessageUpdated {
        message: UiMessage,
    },

    MessagesReplaced {
        messages: Vec<UiMessage>,
    },

    AttachmentsChanged {
        attachments: Vec<Attachment>,
        upload_queue: Vec<String>,
    },

    SelectionChanged {
        model: Option<ModelId>,
        image_model: Option<ModelId>,
        use_native_search: bool,
    },

    ToolkitsChanged {
        toolkits: Vec<ToolkitBinding>,
    },

    Notice {
        message: String,
    },

    StreamFinished {
        op_id: OpId,
    },

    StreamFailed {
        op_id: OpId,
        message: String,
    },
}

impl ChatEvent {
    /// True for events that end an operation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChatEvent::StreamFinished { .. } | ChatEvent::StreamFailed { .. }
        )
    }
}
