use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::{ChatOptions, ImageParams, Message};

const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

pub(crate) fn build_chat_body(
    prompt: &str,
    options: &ChatOptions,
    model: &str,
) -> Result<Value, LLMError> {
    // 1. 无显式 messages 时由单条 prompt 组装
    let mut messages = options
        .messages
        .clone()
        .unwrap_or_else(|| vec![Message::user(prompt)]);
    // 2. system 作为首条消息插入
    if let Some(system) = &options.system {
        messages.insert(0, Message::system(system.clone()));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), convert_messages(&messages)?);
    // 3. 采样参数仅在显式设置时下发
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    Ok(Value::Object(body))
}

pub(crate) fn build_image_body(params: &ImageParams, model: &str) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("prompt".to_string(), Value::String(params.prompt.clone()));
    body.insert(
        "size".to_string(),
        Value::String(
            params
                .size
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_SIZE.to_string()),
        ),
    );
    body.insert("n".to_string(), Value::from(params.n.unwrap_or(1)));
    if let Some(quality) = &params.quality {
        body.insert("quality".to_string(), Value::String(quality.clone()));
    }
    if let Some(style) = &params.style {
        body.insert("style".to_string(), Value::String(style.clone()));
    }
    if let Some(format) = &params.response_format {
        body.insert("response_format".to_string(), Value::String(format.clone()));
    }
    Value::Object(body)
}

pub(crate) fn convert_messages(messages: &[Message]) -> Result<Value, LLMError> {
    serde_json::to_value(messages).map_err(|err| LLMError::Validation {
        message: format!("failed to serialize messages: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_body_wraps_prompt_as_user_message() {
        let body = build_chat_body("你好", &ChatOptions::default(), "gpt-4.1-mini").unwrap();

        assert_eq!(body["model"], json!("gpt-4.1-mini"));
        assert_eq!(
            body["messages"],
            json!([{"role": "user", "content": "你好"}])
        );
        // 未设置的采样参数不进入请求体
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("top_p").is_none());
    }

    #[test]
    fn chat_body_prepends_system_message() {
        let options = ChatOptions {
            system: Some("You are terse.".to_string()),
            ..Default::default()
        };
        let body = build_chat_body("hi", &options, "gpt-4.1-mini").unwrap();

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], json!("system"));
        assert_eq!(messages[0]["content"], json!("You are terse."));
        assert_eq!(messages[1]["role"], json!("user"));
    }

    #[test]
    fn chat_body_prefers_explicit_messages_over_prompt() {
        let options = ChatOptions {
            messages: Some(vec![
                Message::user("first"),
                Message::assistant("second"),
                Message::user("third"),
            ]),
            ..Default::default()
        };
        let body = build_chat_body("ignored prompt", &options, "gpt-4.1-mini").unwrap();

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["content"], json!("third"));
    }

    #[test]
    fn chat_body_forwards_supported_knobs_only() {
        let options = ChatOptions {
            temperature: Some(0.2),
            top_p: Some(0.9),
            max_tokens: Some(128),
            top_k: Some(40),
            stop: Some(vec!["END".to_string()]),
            ..Default::default()
        };
        let body = build_chat_body("hi", &options, "gpt-4.1-mini").unwrap();

        assert_eq!(body["temperature"], json!(0.2f32));
        assert_eq!(body["top_p"], json!(0.9f32));
        assert_eq!(body["max_tokens"], json!(128));
        // top_k 与 stop 不属于该 API
        assert!(body.get("top_k").is_none());
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn image_body_applies_defaults() {
        let body = build_image_body(&ImageParams::new("a red fox"), "dall-e-3");

        assert_eq!(body["model"], json!("dall-e-3"));
        assert_eq!(body["prompt"], json!("a red fox"));
        assert_eq!(body["size"], json!("1024x1024"));
        assert_eq!(body["n"], json!(1));
        assert!(body.get("quality").is_none());
        assert!(body.get("style").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn image_body_forwards_optional_presets() {
        let params = ImageParams {
            size: Some("512x512".to_string()),
            n: Some(2),
            quality: Some("hd".to_string()),
            style: Some("vivid".to_string()),
            response_format: Some("b64_json".to_string()),
            ..ImageParams::new("a red fox")
        };
        let body = build_image_body(&params, "dall-e-3");

        assert_eq!(body["size"], json!("512x512"));
        assert_eq!(body["n"], json!(2));
        assert_eq!(body["quality"], json!("hd"));
        assert_eq!(body["style"], json!("vivid"));
        assert_eq!(body["response_format"], json!("b64_json"));
    }
}
