use serde::Deserialize;
use serde_json::Value;

/// Chat Completions 响应抽取结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChatPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChoice {
    #[serde(default)]
    pub message: Option<OpenAiChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Images API 响应抽取结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiImagePayload {
    #[serde(default)]
    pub data: Vec<OpenAiImageDatum>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiImageDatum {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

/// `/models` 列表抽取结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiModelList {
    #[serde(default)]
    pub data: Vec<OpenAiModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiModelEntry {
    pub id: String,
}
