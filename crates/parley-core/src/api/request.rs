use serde::{Deserialize, Serialize};

use crate::chat::{ChatId, ToolkitBinding, UiMessage, Visibility};
use crate::config::model::ModelId;

/// Body of `POST /api/chat`. Only the newest message is sent; the server holds the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub id: ChatId,
    pub message: UiMessage,
    pub selected_chat_model: ModelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_generation_model: Option<ModelId>,
    pub selected_visibility_type: Visibility,
    pub use_native_search: bool,
    #[serde(default)]
    pub toolkits: Vec<ToolkitBinding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MessageId;
    use chrono::{TimeZone, Utc};
    use parley_toolkits::ToolkitId;
    use serde_json::json;

    #[test]
    fn serializes_web_client_field_names() {
        let chat_id: ChatId = "6f9619ff-8b86-d011-b42d-00c04fc964ff".parse().unwrap();
        let body = ChatRequestBody {
            id: chat_id,
            message: UiMessage::user(
                MessageId::from("m1"),
                "hello",
                vec![],
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            ),
            selected_chat_model: "openai:gpt-4o".parse().unwrap(),
            image_generation_model: None,
            selected_visibility_type: Visibility::Private,
            use_native_search: false,
            toolkits: vec![ToolkitBinding {
                id: ToolkitId::from("spotify"),
                parameters: json!({}),
            }],
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["id"], json!("6f9619ff-8b86-d011-b42d-00c04fc964ff"));
        assert_eq!(value["selectedChatModel"], json!("openai:gpt-4o"));
        assert_eq!(value["selectedVisibilityType"], json!("private"));
        assert_eq!(value["useNativeSearch"], json!(false));
        assert_eq!(value["toolkits"], json!([{ "id": "spotify", "parameters": {} }]));
        assert_eq!(value["message"]["role"], json!("user"));
        assert!(value.get("imageGenerationModel").is_none());
    }
}
