use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::{ChatOptions, Message};

/// Messages API 要求显式的输出上限
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 4096;

pub(crate) fn build_chat_body(
    prompt: &str,
    options: &ChatOptions,
    model: &str,
) -> Result<Value, LLMError> {
    // 1. 无显式 messages 时由单条 prompt 组装
    let messages = options
        .messages
        .clone()
        .unwrap_or_else(|| vec![Message::user(prompt)]);

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "messages".to_string(),
        serde_json::to_value(&messages).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize messages: {err}"),
        })?,
    );
    // 2. max_tokens 为必填字段
    body.insert(
        "max_tokens".to_string(),
        Value::from(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    );
    // 3. system 是顶层字段 不进入 messages
    if let Some(system) = &options.system {
        body.insert("system".to_string(), Value::String(system.clone()));
    }
    // 4. 采样参数仅在显式设置时下发
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(top_k) = options.top_k {
        body.insert("top_k".to_string(), Value::from(top_k));
    }
    Ok(Value::Object(body))
}
