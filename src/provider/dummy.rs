use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::error::LLMError;
use crate::provider::LLMProvider;
use crate::types::{
    CapabilityDescriptor, ChatOptions, ChatResponse, ImageParams, ImageResponse, TokenUsage,
};

const DEFAULT_MODEL: &str = "dummy-model";
const DEFAULT_IMAGE_URL: &str = "https://example.com/dummy-image.png";

/// 虚拟 Provider 记录的一次对话调用
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    pub prompt: String,
    pub options: ChatOptions,
}

#[derive(Default)]
struct DummyState {
    chat_response: Option<String>,
    image_url: Option<String>,
    chat_history: Vec<ChatCall>,
    image_history: Vec<ImageParams>,
}

/// In-memory provider for offline tests and examples.
///
/// Every call is recorded so assertions can inspect what was sent, and the
/// returned content is either a canned value or an echo of the prompt. Clones
/// share the same state, which lets a test keep a handle on an instance that
/// was registered elsewhere.
///
/// # Examples
///
/// ```
/// use kaiwa_llm::provider::LLMProvider;
/// use kaiwa_llm::provider::dummy::DummyProvider;
/// use kaiwa_llm::types::ChatOptions;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let provider = DummyProvider::new().with_chat_response("canned");
/// let handle = provider.clone();
///
/// let response = provider.chat("hi", ChatOptions::default()).await.unwrap();
/// assert_eq!(response.content, "canned");
/// assert_eq!(handle.chat_history().len(), 1);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct DummyProvider {
    state: Arc<Mutex<DummyState>>,
}

impl DummyProvider {
    /// 创建回显模式的虚拟 Provider
    pub fn new() -> Self {
        Self::default()
    }

    /// 预设固定的对话回复
    pub fn with_chat_response(self, response: impl Into<String>) -> Self {
        self.state().chat_response = Some(response.into());
        self
    }

    /// 预设固定的图像 URL
    pub fn with_image_url(self, url: impl Into<String>) -> Self {
        self.state().image_url = Some(url.into());
        self
    }

    /// 运行期替换固定回复
    pub fn set_chat_response(&self, response: impl Into<String>) {
        self.state().chat_response = Some(response.into());
    }

    /// 清除固定回复 恢复回显模式
    pub fn reset_chat_response(&self) {
        self.state().chat_response = None;
    }

    /// 运行期替换固定图像 URL
    pub fn set_image_url(&self, url: impl Into<String>) {
        self.state().image_url = Some(url.into());
    }

    /// 到目前为止收到的全部对话调用
    pub fn chat_history(&self) -> Vec<ChatCall> {
        self.state().chat_history.clone()
    }

    /// 到目前为止收到的全部图像请求
    pub fn image_history(&self) -> Vec<ImageParams> {
        self.state().image_history.clone()
    }

    /// 清空两份调用记录 canned 配置保持不变
    pub fn clear_history(&self) {
        let mut state = self.state();
        state.chat_history.clear();
        state.image_history.clear();
    }

    fn state(&self) -> MutexGuard<'_, DummyState> {
        // 锁中毒时继续使用内部状态
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LLMProvider for DummyProvider {
    async fn chat(&self, prompt: &str, options: ChatOptions) -> Result<ChatResponse, LLMError> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let content = {
            let mut state = self.state();
            state.chat_history.push(ChatCall {
                prompt: prompt.to_string(),
                options,
            });
            state
                .chat_response
                .clone()
                .unwrap_or_else(|| format!("This is a dummy response to: {prompt}"))
        };
        Ok(ChatResponse {
            content: content.clone(),
            raw: json!({"dummy": true, "prompt": prompt, "content": content}),
            model: Some(model),
            id: Some(format!("dummy-{}", Uuid::new_v4())),
            latency_ms: Some(0.0),
            token_usage: TokenUsage::empty(),
        })
    }

    async fn generate_image(&self, params: ImageParams) -> Result<ImageResponse, LLMError> {
        let prompt = params.prompt.clone();
        let url = {
            let mut state = self.state();
            state.image_history.push(params);
            state
                .image_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string())
        };
        Ok(ImageResponse {
            url: Some(url.clone()),
            base64: None,
            raw: json!({"dummy": true, "prompt": prompt, "url": url}),
            revised_prompt: Some(prompt),
        })
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_chat: true,
            supports_image: true,
        }
    }

    fn name(&self) -> &'static str {
        "dummy"
    }
}
