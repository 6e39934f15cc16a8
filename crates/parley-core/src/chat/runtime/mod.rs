mod interpreter;
mod session;

pub use interpreter::EffectInterpreter;
pub use session::{
    ChatSession, ChatSessionConfig, ChatSessionDeps, ChatSessionHandle, SessionError,
};
