use serde::Deserialize;
use serde_json::Value;

/// OpenAI 兼容对话响应的抽取结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LmStudioChatPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<LmStudioChoice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LmStudioChoice {
    #[serde(default)]
    pub message: Option<LmStudioChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LmStudioChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// `/models` 列表抽取结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LmStudioModelList {
    #[serde(default)]
    pub data: Vec<LmStudioModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LmStudioModelEntry {
    pub id: String,
}
