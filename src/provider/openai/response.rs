use serde_json::Value;

use crate::types::{ChatResponse, ImageResponse, TokenUsage};

use super::types::{OpenAiChatPayload, OpenAiImagePayload};

pub(crate) fn map_chat_response(
    parsed: OpenAiChatPayload,
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

pub(crate) fn map_image_response(parsed: OpenAiImagePayload, raw: Value) -> ImageResponse {
    let first = parsed.data.into_iter().next();
    let (url, base64, revised_prompt) = match first {
        Some(datum) => (datum.url, datum.b64_json, datum.revised_prompt),
        None => (None, None, None),
    };
    ImageResponse {
        url,
        base64,
        raw,
        revised_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> OpenAiChatPayload {
        serde_json::from_value(raw).expect("payload should deserialize")
    }

    #[test]
    fn map_chat_response_full_payload() {
        let raw = json!({
            "id": "chatcmpl-1",
            "model": "gpt-4.1-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello world"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let mapped = map_chat_response(parse(raw.clone()), raw.clone(), 12.5);

        assert_eq!(mapped.content, "hello world");
        assert_eq!(mapped.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(mapped.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(mapped.latency_ms, Some(12.5));
        assert_eq!(mapped.raw, raw);
        // usage 映射
        assert_eq!(mapped.token_usage.prompt_tokens, 10);
        assert_eq!(mapped.token_usage.completion_tokens, 5);
        assert_eq!(mapped.token_usage.total_tokens, 15);
    }

    #[test]
    fn map_chat_response_missing_content_yields_empty_string() {
        let raw = json!({"choices": []});
        let mapped = map_chat_response(parse(raw.clone()), raw, 1.0);

        assert_eq!(mapped.content, "");
        assert!(mapped.is_empty());
        assert!(mapped.model.is_none());
    }

    #[test]
    fn map_chat_response_missing_usage_yields_zero() {
        let raw = json!({
            "choices": [{"message": {"content": "ok"}}]
        });
        let mapped = map_chat_response(parse(raw.clone()), raw, 1.0);

        assert!(!mapped.token_usage.has_data());
        assert_eq!(mapped.total_tokens(), 0);
    }

    #[test]
    fn map_image_response_first_datum() {
        let raw = json!({
            "created": 1,
            "data": [
                {"url": "https://images.example/1.png", "revised_prompt": "a crisp red fox"},
                {"url": "https://images.example/2.png"}
            ]
        });
        let parsed: OpenAiImagePayload = serde_json::from_value(raw.clone()).unwrap();
        let mapped = map_image_response(parsed, raw.clone());

        assert_eq!(mapped.url.as_deref(), Some("https://images.example/1.png"));
        assert!(mapped.base64.is_none());
        assert_eq!(mapped.revised_prompt.as_deref(), Some("a crisp red fox"));
        assert_eq!(mapped.raw, raw);
    }

    #[test]
    fn map_image_response_empty_data() {
        let raw = json!({"data": []});
        let parsed: OpenAiImagePayload = serde_json::from_value(raw.clone()).unwrap();
        let mapped = map_image_response(parsed, raw);

        assert!(mapped.url.is_none());
        assert!(mapped.base64.is_none());
        assert!(mapped.revised_prompt.is_none());
    }
}
