use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use super::attachment::Attachment;
use super::types::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
    },
    ToolInvocation {
        tool_call_id: String,
        tool_name: String,
        args: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
}

/// A chat message as the web client renders it.
///
/// `content` mirrors the concatenated text parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    pub id: MessageId,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
    #[serde(
        default,
        rename = "experimental_attachments",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UiMessage {
    pub fn user(
        id: MessageId,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let text = text.into();
        Self {
            id,
            role: Role::User,
            parts: vec![MessagePart::Text { text: text.clone() }],
            content: text,
            attachments,
            created_at: Some(created_at),
        }
    }

    pub fn assistant(id: MessageId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            parts: Vec::new(),
            attachments: Vec::new(),
            created_at: Some(created_at),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn push_text_delta(&mut self, delta: &str) {
        self.content.push_str(delta);
        if let Some(MessagePart::Text { text }) = self.parts.last_mut() {
            text.push_str(delta);
        } else {
            self.parts.push(MessagePart::Text {
                text: delta.to_string(),
            });
        }
    }

    pub fn push_reasoning_delta(&mut self, delta: &str) {
        if let Some(MessagePart::Reasoning { reasoning }) = self.parts.last_mut() {
            reasoning.push_str(delta);
        } else {
            self.parts.push(MessagePart::Reasoning {
                reasoning: delta.to_string(),
            });
        }
    }

    pub fn push_tool_call(&mut self, tool_call_id: String, tool_name: String, args: Value) {
        self.parts.push(MessagePart::ToolInvocation {
            tool_call_id,
            tool_name,
            args,
            result: None,
        });
    }

    /// Returns false when no invocation with that id exists.
    pub fn set_tool_result(&mut self, id: &str, value: Value) -> bool {
        for part in &mut self.parts {
            if let MessagePart::ToolInvocation {
                tool_call_id,
                result,
                ..
            } = part
                && tool_call_id == id
            {
                *result = Some(value);
                return true;
            }
        }
        false
    }

    pub fn reasoning(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Reasoning { reasoning } => Some(reasoning.as_str()),
                _ => None,
            })
            .collect();
        (!text.is_empty()).then_some(text)
    }
}
