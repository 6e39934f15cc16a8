pub mod action;
pub mod attachment;
pub mod effect;
pub mod event;
pub mod gating;
pub mod message;
pub mod reduce;
pub mod runtime;
pub mod state;
pub mod toolkits;
pub mod types;

pub use action::{Action, StreamFailure};
pub use attachment::{Attachment, AttachmentKind};
pub use effect::Effect;
pub use event::ChatEvent;
pub use gating::{CapabilityGate, SubmitBlocker};
pub use message::{MessagePart, Role, UiMessage};
pub use reduce::{InvalidActionKind, ReduceError, reduce};
pub use runtime::{ChatSession, ChatSessionConfig, ChatSessionDeps, ChatSessionHandle, SessionError};
pub use state::ChatState;
pub use toolkits::{ToolkitBinding, ToolkitBindings};
pub use types::{ChatId, ChatStatus, MessageId, OpId, Visibility};
