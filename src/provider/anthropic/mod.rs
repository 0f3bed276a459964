use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpResponse, post_json_with_headers};
use crate::provider::LLMProvider;
use crate::types::{CapabilityDescriptor, ChatOptions, ChatResponse};

use request::build_chat_body;
use response::map_chat_response;
use types::AnthropicChatPayload;

mod request;
mod response;
mod types;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_VERSION: &str = "2023-06-01";
const DEFAULT_CHAT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Anthropic Messages Provider 仅支持对话
pub struct AnthropicProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    version: String,
    chat_model: String,
}

impl AnthropicProvider {
    /// 使用默认 base_url 与 anthropic-version 创建 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    /// 自定义 base_url 便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 自定义 anthropic-version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 设置默认对话模型
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), self.api_key.clone());
        headers.insert("anthropic-version".to_string(), self.version.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, LLMError> {
        let status = response.status;
        let text = response.into_string()?;
        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(LLMError::RequestFailed {
                provider: self.name(),
                status,
                body: text,
            })
        }
    }

    fn parse_raw(&self, text: &str) -> Result<Value, LLMError> {
        serde_json::from_str(text).map_err(|err| LLMError::Provider {
            provider: self.name(),
            message: format!("failed to parse Anthropic response: {err}"),
        })
    }

    fn try_parse<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, LLMError> {
        serde_json::from_value(raw.clone()).map_err(|err| LLMError::Provider {
            provider: self.name(),
            message: format!("failed to parse Anthropic response: {err}"),
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn chat(&self, prompt: &str, options: ChatOptions) -> Result<ChatResponse, LLMError> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.chat_model.clone());
        let body = build_chat_body(prompt, &options, &model)?;

        let started = Instant::now();
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let text = self.ensure_success(response)?;
        let raw = self.parse_raw(&text)?;
        let parsed: AnthropicChatPayload = self.try_parse(&raw)?;
        Ok(map_chat_response(parsed, raw, latency_ms))
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_chat: true,
            supports_image: false,
        }
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
