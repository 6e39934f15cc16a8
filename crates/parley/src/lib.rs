pub mod cli;
pub mod commands;
pub mod error;
pub mod render;

pub use parley_core::{api, chat, config};
