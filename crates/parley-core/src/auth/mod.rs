pub mod providers;

use std::collections::HashMap;
use thiserror::Error;

pub use providers::{OAuthProviderConfig, OAuthProviderKind, configured_providers};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing environment variable {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidVar { var: String, message: String },
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;

    fn contains(&self, key: &str) -> bool {
        self.var(key).is_some()
    }
}

/// The process environment. Empty values count as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}
