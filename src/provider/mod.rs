use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::types::{
    Capability, CapabilityDescriptor, ChatOptions, ChatResponse, ImageParams, ImageResponse,
};

pub mod anthropic;
pub mod dummy;
pub mod lmstudio;
pub mod openai;

/// 统一的 Provider Trait 所有供应商实现该接口即可接入
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 提交对话请求并等待完整响应
    ///
    /// `options.messages` 存在时完整替换单条 prompt
    async fn chat(&self, prompt: &str, options: ChatOptions) -> Result<ChatResponse, LLMError>;

    /// 图像生成 仅部分供应商支持
    async fn generate_image(&self, params: ImageParams) -> Result<ImageResponse, LLMError> {
        let _ = params;
        Err(LLMError::UnsupportedCapability {
            provider: self.name().to_string(),
            capability: Capability::Image,
        })
    }

    /// 描述支持的能力范围
    fn capabilities(&self) -> CapabilityDescriptor;

    /// 供应商名称
    fn name(&self) -> &'static str;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn LLMProvider>;
