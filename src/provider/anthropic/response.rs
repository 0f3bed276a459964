use serde_json::Value;

use crate::types::{ChatResponse, TokenUsage};

use super::types::AnthropicChatPayload;

pub(crate) fn map_chat_response(
    parsed: AnthropicChatPayload,
    raw: Value,
    latency_ms: f64,
) -> ChatResponse {
    // text 块按序拼接 其余块类型忽略
    let content = parsed
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<String>();
    let token_usage = parsed
        .usage
        .as_ref()
        .map(TokenUsage::from_json)
        .unwrap_or_else(TokenUsage::empty);
    ChatResponse {
        content,
        raw,
        model: parsed.model,
        id: parsed.id,
        latency_ms: Some(latency_ms),
        token_usage,
    }
}
