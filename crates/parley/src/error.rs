use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Invalid --toolkit value '{value}': {message}")]
    ToolkitArg { value: String, message: String },

    #[error(transparent)]
    Core(#[from] parley_core::Error),
}
