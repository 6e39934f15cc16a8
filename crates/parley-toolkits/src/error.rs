use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolkitError {
    #[error("Unknown toolkit: {0}")]
    UnknownToolkit(String),

    #[error("Invalid parameters for {toolkit_id}: {message}")]
    InvalidParameters { toolkit_id: String, message: String },

    #[error("Schema error for {toolkit_id}: {message}")]
    Schema { toolkit_id: String, message: String },
}

impl ToolkitError {
    pub fn invalid_parameters<T: Into<String>, M: Into<String>>(toolkit_id: T, message: M) -> Self {
        ToolkitError::InvalidParameters {
            toolkit_id: toolkit_id.into(),
            message: message.into(),
        }
    }

    pub fn toolkit_id(&self) -> &str {
        match self {
            ToolkitError::UnknownToolkit(id) => id,
            ToolkitError::InvalidParameters { toolkit_id, .. }
            | ToolkitError::Schema { toolkit_id, .. } => toolkit_id,
        }
    }
}
