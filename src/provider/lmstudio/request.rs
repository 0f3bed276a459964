use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::{ChatOptions, Message};

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
    body.insert(
        "messages".to_string(),
        serde_json::to_value(&messages).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize messages: {err}"),
        })?,
    );
    // 3. 本地服务器额外支持 stop 序列
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(stop) = &options.stop {
        body.insert(
            "stop".to_string(),
            Value::Array(stop.iter().cloned().map(Value::String).collect()),
        );
    }
    Ok(Value::Object(body))
}
