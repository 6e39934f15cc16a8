pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod drafts;
pub mod error;
pub mod model_registry;
pub mod preferences;
pub mod utils;

pub use error::{Error, Result};
