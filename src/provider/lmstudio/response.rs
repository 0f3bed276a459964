use serde_json::Value;

use crate::types::{ChatResponse, TokenUsage};

use super::types::LmStudioChatPayload;

pub(crate) fn map_chat_response(
    parsed: LmStudioChatPayload,
    raw: Value,
    latency_ms: f64,
) -> ChatResponse {
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();
    // 本地服务器经常不回报 usage
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
