use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::{build_http_client, endpoint, error_from_response, with_session};
use crate::chat::{ChatId, UiMessage, Visibility};
use crate::config::ClientConfig;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: ChatId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub items: Vec<ChatSummary>,
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait ChatHistoryApi: Send + Sync {
    async fn list_chats(&self, limit: usize, cursor: Option<&str>) -> Result<ChatPage, ApiError>;

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApiError>;

    async fn messages(&self, chat_id: ChatId) -> Result<Vec<UiMessage>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpChatHistoryApi {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpChatHistoryApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http_client: build_http_client(&config)?,
            config,
        })
    }

    fn chat_url(&self, chat_id: ChatId, suffix: &str) -> Result<url::Url, ApiError> {
        let path = format!(
            "{}/{chat_id}{suffix}",
            self.config.chats_path.trim_end_matches('/')
        );
        endpoint(&self.config, &path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = with_session(request.timeout(self.config.request_timeout), &self.config)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let text = self.send(request).await?.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::ResponseParsing {
            details: format!("Error: {e}, Body: {text}"),
        })
    }
}

#[async_trait]
impl ChatHistoryApi for HttpChatHistoryApi {
    async fn list_chats(&self, limit: usize, cursor: Option<&str>) -> Result<ChatPage, ApiError> {
        let mut url = endpoint(&self.config, &self.config.chats_path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        debug!(target: "api::history", %url, "Listing chats");
        self.json(self.http_client.get(url)).await
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApiError> {
        let url = self.chat_url(chat_id, "")?;
        debug!(target: "api::history", %chat_id, "Deleting chat");
        self.send(self.http_client.delete(url)).await?;
        Ok(())
    }

    async fn messages(&self, chat_id: ChatId) -> Result<Vec<UiMessage>, ApiError> {
        let url = self.chat_url(chat_id, "/messages")?;
        self.json(self.http_client.get(url)).await
    }
}

/// Cursor-paginated list of the user's chats, newest first.
pub struct ChatHistory {
    api: Arc<dyn ChatHistoryApi>,
    page_size: usize,
    pages: Vec<ChatPage>,
}

impl ChatHistory {
    pub fn new(api: Arc<dyn ChatHistoryApi>) -> Self {
        Self::with_page_size(api, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(api: Arc<dyn ChatHistoryApi>, page_size: usize) -> Self {
        Self {
            api,
            page_size,
            pages: Vec::new(),
        }
    }

    /// True before the first fetch, and afterwards while the server reports more.
    pub fn has_next_page(&self) -> bool {
        match self.pages.last() {
            None => true,
            Some(page) => page.has_more && page.next_cursor.is_some(),
        }
    }

    /// Fetch the next page. Returns false when there was nothing left to fetch.
    pub async fn fetch_next_page(&mut self) -> Result<bool, ApiError> {
        if !self.has_next_page() {
            return Ok(false);
        }

        let cursor = self.pages.last().and_then(|p| p.next_cursor.clone());
        let page = self
            .api
            .list_chats(self.page_size, cursor.as_deref())
            .await?;
        debug!(
            target: "api::history",
            items = page.items.len(),
            has_more = page.has_more,
            "Fetched chat page"
        );
        self.pages.push(page);
        Ok(true)
    }

    pub fn items(&self) -> impl Iterator<Item = &ChatSummary> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }

    /// Delete a chat on the server and drop it from the loaded pages.
    pub async fn remove(&mut self, chat_id: ChatId) -> Result<(), ApiError> {
        self.api.delete_chat(chat_id).await?;
        for page in &mut self.pages {
            page.items.retain(|chat| chat.id != chat_id);
        }
        Ok(())
    }
}

/// Per-chat message lists, fetched on first use and dropped when a stream finishes.
pub struct MessageCache {
    api: Arc<dyn ChatHistoryApi>,
    entries: RwLock<HashMap<ChatId, Vec<UiMessage>>>,
}

impl MessageCache {
    pub fn new(api: Arc<dyn ChatHistoryApi>) -> Self {
        Self {
            api,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, chat_id: ChatId) -> Result<Vec<UiMessage>, ApiError> {
        if let Some(messages) = self.entries.read().await.get(&chat_id) {
            return Ok(messages.clone());
        }

        let messages = self.api.messages(chat_id).await?;
        self.entries
            .write()
            .await
            .insert(chat_id, messages.clone());
        Ok(messages)
    }

    pub async fn invalidate(&self, chat_id: ChatId) {
        if self.entries.write().await.remove(&chat_id).is_some() {
            debug!(target: "api::history", %chat_id, "Invalidated cached messages");
        }
    }
}
