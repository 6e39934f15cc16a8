pub mod chat;
pub mod error;
pub mod history;
pub mod request;
pub mod sse;
pub mod stream;
pub mod upload;

pub use chat::{ChatApi, HttpChatApi};
pub use error::{ApiError, ChatSdkError, ErrorType, Surface, user_facing_message};
pub use history::{ChatHistory, ChatHistoryApi, ChatPage, ChatSummary, HttpChatHistoryApi, MessageCache};
pub use request::ChatRequestBody;
pub use stream::{DataPart, PartStream, StreamPart};
pub use upload::{HttpUploadApi, UploadApi, UploadError, UploadFile, UploadOutcome, upload_all};

use reqwest::header::COOKIE;
use url::Url;

use crate::config::{ClientConfig, SESSION_COOKIE};
use error::ErrorBody;

pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .connect_timeout(config.request_timeout)
        .build()
        .map_err(ApiError::from)
}

pub(crate) fn endpoint(config: &ClientConfig, path: &str) -> Result<Url, ApiError> {
    config.endpoint(path).map_err(ApiError::from)
}

/// Attach the session cookie, if one is configured.
pub(crate) fn with_session(
    builder: reqwest::RequestBuilder,
    config: &ClientConfig,
) -> reqwest::RequestBuilder {
    match &config.session_token {
        Some(token) => builder.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
        None => builder,
    }
}

/// Turn a non-2xx response into an error, preferring the service's typed `{code, cause}` body.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return ApiError::Network(e),
    };

    let typed = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| {
            parsed
                .code
                .parse::<ChatSdkError>()
                .ok()
                .map(|err| match parsed.cause {
                    Some(cause) => err.with_cause(cause),
                    None => err,
                })
        });

    match typed {
        Some(err) => {
            tracing::debug!(target: "api::error", code = %err.code(), status, "Service returned typed error");
            ApiError::ChatSdk(err)
        }
        None => ApiError::Status { status, body },
    }
}
