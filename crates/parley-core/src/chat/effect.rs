use crate::api::request::ChatRequestBody;

use super::event::ChatEvent;
use super::types::{ChatId, OpId};

#[derive(Debug, Clone)]
pub enum Effect {
    EmitEvent { event: ChatEvent },

    /// Show a transient message to the user.
    Notify { message: String },

    CallModel { op_id: OpId, body: Box<ChatRequestBody> },

    ResumeStream { op_id: OpId, chat_id: ChatId },

    CancelOperation { op_id: OpId },

    PersistDraft { input: String },

    InvalidateHistory { chat_id: ChatId },
}
