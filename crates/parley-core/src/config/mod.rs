pub mod model;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::{EnvSource, ProcessEnv};
use crate::error::{Error, Result};
use crate::utils::paths::AppPaths;

pub use model::{ImageModel, LanguageModel, LanguageModelCapability, ModelId};

pub const BASE_URL_ENV: &str = "PARLEY_BASE_URL";
pub const SESSION_TOKEN_ENV: &str = "PARLEY_SESSION_TOKEN";
pub const CONFIG_PATH_ENV: &str = "PARLEY_CONFIG";

/// Name of the cookie the web app reads its session from.
pub const SESSION_COOKIE: &str = "authjs.session-token";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_STREAM_THROTTLE_MS: u64 = 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Everything the HTTP clients and the session runtime need to reach the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub chat_path: String,
    pub upload_path: String,
    pub chats_path: String,
    pub session_token: Option<String>,
    pub stream_throttle: Duration,
    pub request_timeout: Duration,
    pub auto_resume: bool,
}

/// On-disk shape of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub base_url: Option<Url>,
    pub chat_path: Option<String>,
    pub upload_path: Option<String>,
    pub chats_path: Option<String>,
    pub session_token: Option<String>,
    pub stream_throttle_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub auto_resume: Option<bool>,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            chat_path: "/api/chat".to_string(),
            upload_path: "/api/files/upload".to_string(),
            chats_path: "/api/chats".to_string(),
            session_token: None,
            stream_throttle: Duration::from_millis(DEFAULT_STREAM_THROTTLE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            auto_resume: true,
        }
    }

    /// Defaults pointing at a local development server.
    pub fn local() -> Result<Self> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| Error::Configuration(format!("Invalid default base URL: {e}")))?;
        Ok(Self::new(base_url))
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_stream_throttle(mut self, throttle: Duration) -> Self {
        self.stream_throttle = throttle;
        self
    }

    pub fn with_auto_resume(mut self, auto_resume: bool) -> Self {
        self.auto_resume = auto_resume;
        self
    }

    /// `<config dir>/parley/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        AppPaths::user_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load defaults, then the config file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, &ProcessEnv)
    }

    pub fn load_with_env(path: Option<&Path>, env: &impl EnvSource) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env.var(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(Self::default_path);

        let mut config = Self::local()?;

        if let Some(path) = path
            && path.exists()
        {
            let contents = std::fs::read_to_string(&path)?;
            let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
                Error::Configuration(format!(
                    "Failed to parse config at {}: {e}",
                    path.display()
                ))
            })?;
            tracing::debug!(path = %path.display(), "Loaded client config file");
            config.apply_file(file);
        }

        config.apply_env(env)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(path) = file.chat_path {
            self.chat_path = path;
        }
        if let Some(path) = file.upload_path {
            self.upload_path = path;
        }
        if let Some(path) = file.chats_path {
            self.chats_path = path;
        }
        if file.session_token.is_some() {
            self.session_token = file.session_token;
        }
        if let Some(ms) = file.stream_throttle_ms {
            self.stream_throttle = Duration::from_millis(ms);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(auto_resume) = file.auto_resume {
            self.auto_resume = auto_resume;
        }
    }

    fn apply_env(&mut self, env: &impl EnvSource) -> Result<()> {
        if let Some(raw) = env.var(BASE_URL_ENV) {
            self.base_url = Url::parse(&raw)
                .map_err(|e| Error::Configuration(format!("Invalid {BASE_URL_ENV} '{raw}': {e}")))?;
        }
        if let Some(token) = env.var(SESSION_TOKEN_ENV) {
            self.session_token = Some(token);
        }
        Ok(())
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Configuration(format!("Invalid endpoint path '{path}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_web_app_routes() {
        let config = ClientConfig::local().unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.chat_path, "/api/chat");
        assert_eq!(config.upload_path, "/api/files/upload");
        assert_eq!(config.stream_throttle, Duration::from_millis(100));
        assert!(config.auto_resume);
    }

    #[test]
    fn file_then_env_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://chat.example.com"
session_token = "from-file"
stream_throttle_ms = 250
"#,
        )
        .unwrap();

        let config = ClientConfig::load_with_env(
            Some(&path),
            &env(&[(SESSION_TOKEN_ENV, "from-env")]),
        )
        .unwrap();

        assert_eq!(config.base_url.as_str(), "https://chat.example.com/");
        assert_eq!(config.session_token.as_deref(), Some("from-env"));
        assert_eq!(config.stream_throttle, Duration::from_millis(250));
    }

    #[test]
    fn config_path_can_come_from_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "auto_resume = false\n").unwrap();

        let config = ClientConfig::load_with_env(
            None,
            &env(&[(CONFIG_PATH_ENV, path.to_str().unwrap())]),
        )
        .unwrap();
        assert!(!config.auto_resume);
    }

    #[test]
    fn invalid_base_url_env_is_an_error() {
        let err = ClientConfig::load_with_env(
            Some(Path::new("/nonexistent/parley.toml")),
            &env(&[(BASE_URL_ENV, "not a url")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn endpoint_joins_paths() {
        let config = ClientConfig::new(Url::parse("https://chat.example.com/app/").unwrap());
        assert_eq!(
            config.endpoint("/api/chat").unwrap().as_str(),
            "https://chat.example.com/api/chat"
        );
    }
}
