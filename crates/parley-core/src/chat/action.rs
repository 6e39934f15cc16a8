use chrono::{DateTime, Utc};
use parley_toolkits::ToolkitId;

use crate::api::error::{ApiError, user_facing_message};
use crate::api::stream::StreamPart;
use crate::config::model::{ImageModel, LanguageModel};

use super::attachment::Attachment;
use super::message::UiMessage;
use super::toolkits::ToolkitBinding;
use super::types::{MessageId, OpId};

#[derive(Debug, Clone)]
pub enum Action {
    SetInput {
        input: String,
    },

    SelectModel {
        model: LanguageModel,
    },

    SetNativeSearch {
        enabled: bool,
    },

    SelectImageModel {
        model: Option<ImageModel>,
    },

    /// Parameters must already be validated against the toolkit's schema.
    AddToolkit {
        binding: ToolkitBinding,
    },

    RemoveToolkit {
        id: ToolkitId,
    },

    UploadsStarted {
        names: Vec<String>,
    },

    /// `names` is the batch passed to the matching `UploadsStarted`.
    UploadsFinished {
        names: Vec<String>,
        attachments: Vec<Attachment>,
        /// User-facing message per failed file.
        failures: Vec<String>,
    },

    RemoveAttachment {
        url: String,
    },

    Submit {
        op_id: OpId,
        message_id: MessageId,
        timestamp: DateTime<Utc>,
    },

    Reload {
        op_id: OpId,
    },

    StreamPart {
        op_id: OpId,
        part: StreamPart,
        received_at: DateTime<Utc>,
    },

    StreamFinished {
        op_id: OpId,
    },

    StreamFailed {
        op_id: OpId,
        failure: StreamFailure,
    },

    Stop,

    Resume {
        op_id: OpId,
    },

    ResumeUnavailable {
        op_id: OpId,
    },

    SetMessages {
        messages: Vec<UiMessage>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFailure {
    pub user_message: String,
    pub detail: String,
}

impl StreamFailure {
    pub fn from_api_error(error: &ApiError) -> Self {
        Self {
            user_message: user_facing_message(error),
            detail: error.to_string(),
        }
    }
}
