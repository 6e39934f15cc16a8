use futures_core::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::sse::SseStream;
use crate::chat::MessageId;

/// One event of a chat response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StreamPart {
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<MessageId>,
    },
    TextDelta {
        delta: String,
    },
    ReasoningDelta {
        delta: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        #[serde(default)]
        args: Value,
    },
    ToolResult {
        tool_call_id: String,
        result: Value,
    },
    Data {
        data: DataPart,
    },
    Error {
        error_text: String,
    },
    Finish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

const KNOWN_PART_TYPES: &[&str] = &[
    "start",
    "text-delta",
    "reasoning-delta",
    "tool-call",
    "tool-result",
    "data",
    "error",
    "finish",
];

impl StreamPart {
    /// Parts that carry assistant output.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            StreamPart::TextDelta { .. }
                | StreamPart::ReasoningDelta { .. }
                | StreamPart::ToolCall { .. }
                | StreamPart::ToolResult { .. }
        )
    }
}

/// Side-channel payloads sent with the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DataPart {
    /// A complete message, JSON-encoded, sent when resuming a stream that already finished.
    AppendMessage { message: String },
    #[serde(other)]
    Other,
}

pub type PartStream = Pin<Box<dyn Stream<Item = Result<StreamPart, ApiError>> + Send>>;

/// Decode SSE events into stream parts.
///
/// Ends at `[DONE]` or when the token is cancelled. Parts of unknown type are skipped.
pub fn decode_parts(sse_stream: SseStream, token: CancellationToken) -> PartStream {
    let stream = async_stream::stream! {
        tokio::pin!(sse_stream);

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(target: "api::stream", "Cancellation token triggered, closing stream");
                    break;
                }
                next = sse_stream.next() => next,
            };

            let Some(event_result) = next else {
                break;
            };

            let event = match event_result {
                Ok(event) => event,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            };

            if event.is_done() {
                break;
            }
            if event.data.trim().is_empty() {
                continue;
            }

            match decode_part(&event.data) {
                Ok(Some(part)) => yield Ok(part),
                Ok(None) => continue,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

fn decode_part(data: &str) -> Result<Option<StreamPart>, ApiError> {
    let value: Value = serde_json::from_str(data).map_err(|e| ApiError::ResponseParsing {
        details: format!("Error: {e}, Data: {data}"),
    })?;

    let part_type = value.get("type").and_then(Value::as_str).unwrap_or_default();
    if !KNOWN_PART_TYPES.contains(&part_type) {
        debug!(target: "api::stream", part_type, "Skipping unknown stream part");
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ApiError::ResponseParsing {
            details: format!("Error: {e}, Data: {data}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sse::parse_sse_stream;
    use futures_util::stream;
    use serde_json::json;
    use tokio_util::bytes::Bytes;

    fn sse(body: &'static str) -> SseStream {
        parse_sse_stream(stream::once(async move {
            Ok::<_, std::io::Error>(Bytes::from(body))
        }))
    }

    async fn collect(stream: PartStream) -> Vec<Result<StreamPart, ApiError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn decodes_until_done() {
        let parts = collect(decode_parts(
            sse(concat!(
                "data: {\"type\":\"start\",\"messageId\":\"m1\"}\n\n",
                "data: {\"type\":\"text-delta\",\"delta\":\"Hi\"}\n\n",
                "data: {\"type\":\"finish\",\"finishReason\":\"stop\"}\n\n",
                "data: [DONE]\n\n",
                "data: {\"type\":\"text-delta\",\"delta\":\"late\"}\n\n",
            )),
            CancellationToken::new(),
        ))
        .await;

        let parts: Vec<_> = parts.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            parts,
            vec![
                StreamPart::Start {
                    message_id: Some(MessageId::from("m1"))
                },
                StreamPart::TextDelta {
                    delta: "Hi".to_string()
                },
                StreamPart::Finish {
                    finish_reason: Some("stop".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn skips_unknown_part_types() {
        let parts = collect(decode_parts(
            sse(concat!(
                "data: {\"type\":\"source-url\",\"url\":\"https://x\"}\n\n",
                "data: {\"type\":\"reasoning-delta\",\"delta\":\"hm\"}\n\n",
            )),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(parts.len(), 1);
        assert!(matches!(
            parts[0].as_ref().unwrap(),
            StreamPart::ReasoningDelta { .. }
        ));
    }

    #[tokio::test]
    async fn malformed_known_part_is_an_error() {
        let parts = collect(decode_parts(
            sse("data: {\"type\":\"text-delta\"}\n\n"),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0], Err(ApiError::ResponseParsing { .. })));
    }

    #[tokio::test]
    async fn cancelled_token_ends_stream() {
        let token = CancellationToken::new();
        token.cancel();
        let parts = collect(decode_parts(
            sse("data: {\"type\":\"text-delta\",\"delta\":\"Hi\"}\n\n"),
            token,
        ))
        .await;
        assert!(parts.is_empty());
    }

    #[test]
    fn data_parts() {
        let part: StreamPart = serde_json::from_value(json!({
            "type": "data",
            "data": { "type": "append-message", "message": "{\"id\":\"m1\"}" }
        }))
        .unwrap();
        assert!(matches!(
            part,
            StreamPart::Data {
                data: DataPart::AppendMessage { .. }
            }
        ));

        let other: DataPart =
            serde_json::from_value(json!({ "type": "usage", "tokens": 12 })).unwrap();
        assert_eq!(other, DataPart::Other);
    }
}
