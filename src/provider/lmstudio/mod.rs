use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpRequest, HttpResponse};
use crate::provider::LLMProvider;
use crate::types::{CapabilityDescriptor, ChatOptions, ChatResponse};

use request::build_chat_body;
use response::map_chat_response;
use types::{LmStudioChatPayload, LmStudioModelList};

mod request;
mod response;
mod types;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 1234;
const DEFAULT_CHAT_MODEL: &str = "local-model";
/// 本地推理可能非常慢 默认放宽到 120 秒
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// 探活用短超时 避免服务未启动时长时间阻塞
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// LM Studio 本地服务器 Provider（OpenAI 兼容接口）
pub struct LmStudioProvider {
    transport: DynHttpTransport,
    host: String,
    port: u16,
    timeout: Duration,
    api_key: Option<String>,
    chat_model: String,
}

impl LmStudioProvider {
    /// 创建指向 127.0.0.1:1234 的 Provider
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            transport,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    /// 自定义主机名
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// 自定义端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 自定义请求超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 可选的 Bearer 凭证 本地默认不需要
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// 设置默认对话模型
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Checks whether the local server answers the `/models` probe.
    pub async fn is_available(&self) -> bool {
        match self.send_probe().await {
            Ok(response) => (200..300).contains(&response.status),
            Err(err) => {
                tracing::debug!(error = %err, "lmstudio availability probe failed");
                false
            }
        }
    }

    /// Lists models loaded into the local server, empty on any failure.
    pub async fn list_models(&self) -> Vec<String> {
        let response = match self.send_probe().await {
            Ok(response) if (200..300).contains(&response.status) => response,
            Ok(_) => return Vec::new(),
            Err(err) => {
                tracing::debug!(error = %err, "lmstudio model list probe failed");
                return Vec::new();
            }
        };
        let Ok(text) = response.into_string() else {
            return Vec::new();
        };
        match serde_json::from_str::<LmStudioModelList>(&text) {
            Ok(list) => list.data.into_iter().map(|model| model.id).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.port)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(api_key) = &self.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {api_key}"));
        }
        headers
    }

    async fn send_request(&self, body: &Value) -> Result<HttpResponse, LLMError> {
        let payload = serde_json::to_vec(body).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize request: {err}"),
        })?;
        let request = HttpRequest::post_json(self.endpoint("/chat/completions"), payload)
            .with_headers(self.build_headers())
            .with_timeout(self.timeout);
        self.transport.send(request).await
    }

    async fn send_probe(&self) -> Result<HttpResponse, LLMError> {
        let request = HttpRequest::get(self.endpoint("/models"))
            .with_headers(self.build_headers())
            .with_timeout(PROBE_TIMEOUT);
        self.transport.send(request).await
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
            message: format!("failed to parse LM Studio response: {err}"),
        })
    }

    fn try_parse<T: DeserializeOwned>(&self, raw: &Value) -> Result<T, LLMError> {
        serde_json::from_value(raw.clone()).map_err(|err| LLMError::Provider {
            provider: self.name(),
            message: format!("failed to parse LM Studio response: {err}"),
        })
    }
}

#[async_trait]
impl LLMProvider for LmStudioProvider {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn chat(&self, prompt: &str, options: ChatOptions) -> Result<ChatResponse, LLMError> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.chat_model.clone());
        let body = build_chat_body(prompt, &options, &model)?;

        let started = Instant::now();
        let response = self.send_request(&body).await?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let text = self.ensure_success(response)?;
        let raw = self.parse_raw(&text)?;
        let parsed: LmStudioChatPayload = self.try_parse(&raw)?;
        Ok(map_chat_response(parsed, raw, latency_ms))
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_chat: true,
            supports_image: false,
        }
    }

    fn name(&self) -> &'static str {
        "lmstudio"
    }
}
