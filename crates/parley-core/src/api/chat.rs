use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::error::{ApiError, Surface};
use crate::api::request::ChatRequestBody;
use crate::api::sse::parse_sse_stream;
use crate::api::stream::{PartStream, decode_parts};
use crate::api::{build_http_client, endpoint, error_from_response, with_session};
use crate::chat::ChatId;
use crate::config::ClientConfig;

/// The streaming chat endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Submit a message and stream the assistant's reply.
    async fn send(
        &self,
        body: &ChatRequestBody,
        token: CancellationToken,
    ) -> Result<PartStream, ApiError>;

    /// Reattach to the chat's most recent stream. `None` when there is nothing to resume.
    async fn resume(
        &self,
        chat_id: ChatId,
        token: CancellationToken,
    ) -> Result<Option<PartStream>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpChatApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http_client: build_http_client(&config)?,
            config,
        })
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        token: &CancellationToken,
    ) -> Result<reqwest::Response, ApiError> {
        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(target: "api::chat", "Cancellation token triggered before response");
                return Err(ApiError::Cancelled);
            }
            res = with_session(request, &self.config).send() => res,
        };

        response.map_err(|e| {
            if e.is_connect() {
                debug!(target: "api::chat", error = %e, "Chat endpoint unreachable");
                ApiError::offline(Surface::Chat)
            } else {
                ApiError::Network(e)
            }
        })
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send(
        &self,
        body: &ChatRequestBody,
        token: CancellationToken,
    ) -> Result<PartStream, ApiError> {
        let url = endpoint(&self.config, &self.config.chat_path)?;
        debug!(target: "api::chat", chat_id = %body.id, %url, "Sending chat message");

        let response = self
            .execute(self.http_client.post(url).json(body), &token)
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let sse_stream = parse_sse_stream(response.bytes_stream());
        Ok(decode_parts(sse_stream, token))
    }

    async fn resume(
        &self,
        chat_id: ChatId,
        token: CancellationToken,
    ) -> Result<Option<PartStream>, ApiError> {
        let mut url = endpoint(&self.config, &self.config.chat_path)?;
        url.query_pairs_mut()
            .append_pair("chatId", &chat_id.to_string());
        debug!(target: "api::chat", %chat_id, "Resuming chat stream");

        let response = self.execute(self.http_client.get(url), &token).await?;

        if response.status() == StatusCode::NO_CONTENT {
            debug!(target: "api::chat", %chat_id, "No stream to resume");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let sse_stream = parse_sse_stream(response.bytes_stream());
        Ok(Some(decode_parts(sse_stream, token)))
    }
}
