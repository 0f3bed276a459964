use serde::Deserialize;
use serde_json::Value;

/// Messages API 响应抽取结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnthropicChatPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnthropicContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}
