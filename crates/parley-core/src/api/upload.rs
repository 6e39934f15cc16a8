use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::error::ApiError;
use crate::api::{build_http_client, endpoint, with_session};
use crate::chat::Attachment;
use crate::config::ClientConfig;

pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload file, please try again!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, content_type, bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The service refused the file and said why.
    #[error("{0}")]
    Rejected(String),

    #[error("Upload failed: {0}")]
    Transport(String),
}

impl UploadError {
    pub fn user_message(&self) -> &str {
        match self {
            UploadError::Rejected(message) => message,
            UploadError::Transport(_) => UPLOAD_FAILED_MESSAGE,
        }
    }
}

impl From<ApiError> for UploadError {
    fn from(err: ApiError) -> Self {
        UploadError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub name: String,
    pub error: UploadError,
}

/// Result of a batch: successes in input order, plus one entry per failed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    pub attachments: Vec<Attachment>,
    pub failures: Vec<UploadFailure>,
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<Attachment, UploadError>;
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpUploadApi {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpUploadApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http_client: build_http_client(&config)?,
            config,
        })
    }
}

#[async_trait]
impl UploadApi for HttpUploadApi {
    async fn upload(&self, file: UploadFile) -> Result<Attachment, UploadError> {
        let url = endpoint(&self.config, &self.config.upload_path)?;
        let name = file.name.clone();

        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .http_client
            .post(url)
            .timeout(self.config.request_timeout)
            .multipart(form);
        let response = with_session(request, &self.config)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if status.is_success() {
            let attachment: Attachment = serde_json::from_str(&body)
                .map_err(|e| UploadError::Transport(format!("Invalid upload response: {e}")))?;
            debug!(target: "api::upload", file = %name, url = %attachment.url, "Uploaded file");
            return Ok(attachment);
        }

        match serde_json::from_str::<UploadErrorBody>(&body) {
            Ok(UploadErrorBody { error }) => Err(UploadError::Rejected(error)),
            Err(_) => Err(UploadError::Transport(format!(
                "Server returned {}: {body}",
                status.as_u16()
            ))),
        }
    }
}

/// Upload every file concurrently. One failure does not affect the others.
pub async fn upload_all(api: &dyn UploadApi, files: Vec<UploadFile>) -> UploadOutcome {
    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let results = join_all(files.into_iter().map(|file| api.upload(file))).await;

    let mut outcome = UploadOutcome::default();
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(attachment) => outcome.attachments.push(attachment),
            Err(error) => {
                warn!(target: "api::upload", file = %name, error = %error, "Upload failed");
                outcome.failures.push(UploadFailure { name, error });
            }
        }
    }
    outcome
}
