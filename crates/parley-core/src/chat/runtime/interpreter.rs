use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::chat::ChatApi;
use crate::api::error::ApiError;
use crate::api::request::ChatRequestBody;
use crate::api::stream::PartStream;
use crate::chat::action::{Action, StreamFailure};
use crate::chat::types::{ChatId, OpId};

/// Runs the network side of effects and reports back as actions.
#[derive(Clone)]
pub struct EffectInterpreter {
    chat_api: Arc<dyn ChatApi>,
}

impl EffectInterpreter {
    pub fn new(chat_api: Arc<dyn ChatApi>) -> Self {
        Self { chat_api }
    }

    pub async fn stream_reply(
        &self,
        op_id: OpId,
        body: ChatRequestBody,
        cancel_token: CancellationToken,
        action_tx: mpsc::Sender<Action>,
    ) {
        match self.chat_api.send(&body, cancel_token.clone()).await {
            Ok(stream) => forward_parts(op_id, stream, cancel_token, action_tx).await,
            Err(error) => report_failure(op_id, &error, &cancel_token, &action_tx).await,
        }
    }

    pub async fn resume_stream(
        &self,
        op_id: OpId,
        chat_id: ChatId,
        cancel_token: CancellationToken,
        action_tx: mpsc::Sender<Action>,
    ) {
        match self.chat_api.resume(chat_id, cancel_token.clone()).await {
            Ok(Some(stream)) => forward_parts(op_id, stream, cancel_token, action_tx).await,
            Ok(None) => {
                let _ = action_tx.send(Action::ResumeUnavailable { op_id }).await;
            }
            Err(ApiError::Cancelled) => {}
            Err(error) => {
                warn!(chat_id = %chat_id, error = %error, "Failed to resume chat stream");
                let _ = action_tx.send(Action::ResumeUnavailable { op_id }).await;
            }
        }
    }
}

async fn forward_parts(
    op_id: OpId,
    mut stream: PartStream,
    cancel_token: CancellationToken,
    action_tx: mpsc::Sender<Action>,
) {
    while let Some(item) = stream.next().await {
        let action = match item {
            Ok(part) => Action::StreamPart {
                op_id,
                part,
                received_at: Utc::now(),
            },
            Err(error) => {
                report_failure(op_id, &error, &cancel_token, &action_tx).await;
                return;
            }
        };

        if action_tx.send(action).await.is_err() {
            debug!(op_id = %op_id, "Session closed while streaming");
            return;
        }
    }

    // A stopped op has already been settled by the reducer.
    if cancel_token.is_cancelled() {
        return;
    }
    let _ = action_tx.send(Action::StreamFinished { op_id }).await;
}

async fn report_failure(
    op_id: OpId,
    error: &ApiError,
    cancel_token: &CancellationToken,
    action_tx: &mpsc::Sender<Action>,
) {
    if cancel_token.is_cancelled() || matches!(error, ApiError::Cancelled) {
        return;
    }
    let _ = action_tx
        .send(Action::StreamFailed {
            op_id,
            failure: StreamFailure::from_api_error(error),
        })
        .await;
}
