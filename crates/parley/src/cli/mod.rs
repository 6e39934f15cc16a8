pub mod args;
pub mod config;

pub use args::{AuthCommands, ChatsCommands, Cli, Commands, ModelsCommands, PreferencesCommands};
