use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpResponse, get_with_headers, post_json_with_headers};
use crate::provider::LLMProvider;
use crate::types::{CapabilityDescriptor, ChatOptions, ChatResponse, ImageParams, ImageResponse};

use request::{build_chat_body, build_image_body};
use response::{map_chat_response, map_image_response};
use types::{OpenAiChatPayload, OpenAiImagePayload, OpenAiModelList};

mod request;
mod response;
mod types;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// OpenAI Chat Completions + Images Provider
pub struct OpenAiProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    chat_model: String,
    image_model: String,
}

impl OpenAiProvider {
    /// 创建带默认 base_url 与默认模型的 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置默认对话模型
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// 设置默认图像模型
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Checks whether the API answers the `/models` probe.
    ///
    /// Probe failures of any kind degrade to `false`.
    pub async fn is_available(&self) -> bool {
        match self.send_probe().await {
            Ok(response) => (200..300).contains(&response.status),
            Err(err) => {
                tracing::debug!(error = %err, "openai availability probe failed");
                false
            }
        }
    }

    /// Lists model identifiers exposed by the API.
    ///
    /// Returns an empty list when the probe fails for any reason.
    pub async fn list_models(&self) -> Vec<String> {
        let response = match self.send_probe().await {
            Ok(response) if (200..300).contains(&response.status) => response,
            Ok(_) => return Vec::new(),
            Err(err) => {
                tracing::debug!(error = %err, "openai model list probe failed");
                return Vec::new();
            }
        };
        let Ok(text) = response.into_string() else {
            return Vec::new();
        };
        match serde_json::from_str::<OpenAiModelList>(&text) {
            Ok(list) => list.data.into_iter().map(|model| model.id).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}{path}")
        } else {
            format!("{base}/v1{path}")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    async fn send_probe(&self) -> Result<HttpResponse, LLMError> {
        get_with_headers(
            self.transport.as_ref(),
            self.endpoint("/models"),
            self.build_headers(),
        )
        .await
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
            message: format!("failed to parse OpenAI response: {err}"),
        })
    }

    fn try_parse<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, LLMError> {
        serde_json::from_value(raw.clone()).map_err(|err| LLMError::Provider {
            provider: self.name(),
            message: format!("failed to parse OpenAI response: {err}"),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
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
            self.endpoint("/chat/completions"),
            self.build_headers(),
            &body,
        )
        .await?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let text = self.ensure_success(response)?;
        let raw = self.parse_raw(&text)?;
        let parsed: OpenAiChatPayload = self.try_parse(&raw)?;
        Ok(map_chat_response(parsed, raw, latency_ms))
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn generate_image(&self, params: ImageParams) -> Result<ImageResponse, LLMError> {
        let model = params
            .model
            .clone()
            .unwrap_or_else(|| self.image_model.clone());
        let body = build_image_body(&params, &model);

        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint("/images/generations"),
            self.build_headers(),
            &body,
        )
        .await?;

        let text = self.ensure_success(response)?;
        let raw = self.parse_raw(&text)?;
        let parsed: OpenAiImagePayload = self.try_parse(&raw)?;
        Ok(map_image_response(parsed, raw))
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_chat: true,
            supports_image: true,
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
