use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use crate::config::{LLMConfig, ProviderConfig};
use crate::conversation::Conversation;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::http::reqwest::default_dyn_transport;
use crate::provider::DynProvider;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::dummy::DummyProvider;
use crate::provider::lmstudio::LmStudioProvider;
use crate::provider::openai::OpenAiProvider;
use crate::store::DynConversationStore;
use crate::store::memory::MemoryStore;
use crate::types::{Capability, ChatOptions, ChatResponse, ImageParams, ImageResponse};

const DEFAULT_PROVIDER: &str = "openai";

/// 自定义 driver 工厂 注册后优先于内置 driver
pub type DriverFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<DynProvider, LLMError> + Send + Sync>;

/// 调用入口 按配置解析 Provider 并缓存实例
///
/// The manager owns no mutable "current provider": every call names its
/// target explicitly, either through the default provider or through a
/// [`ProviderHandle`] obtained from [`using`](LLMManager::using), so calls
/// from concurrent tasks cannot redirect each other.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use kaiwa_llm::config::{LLMConfig, ProviderConfig};
/// use kaiwa_llm::manager::LLMManager;
/// use kaiwa_llm::types::ChatOptions;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = LLMConfig {
///     default: Some("test".to_string()),
///     providers: HashMap::from([(
///         "test".to_string(),
///         ProviderConfig {
///             driver: "dummy".to_string(),
///             ..ProviderConfig::default()
///         },
///     )]),
///     ..LLMConfig::default()
/// };
///
/// let manager = LLMManager::new(config).unwrap();
/// let reply = manager.chat("ping", ChatOptions::default()).await.unwrap();
/// assert_eq!(reply, "This is a dummy response to: ping");
/// # });
/// ```
pub struct LLMManager {
    config: RwLock<LLMConfig>,
    transport: DynHttpTransport,
    clients: RwLock<HashMap<String, DynProvider>>,
    creators: RwLock<HashMap<String, DriverFactory>>,
    store: RwLock<Option<DynConversationStore>>,
}

impl LLMManager {
    /// 使用默认 reqwest 传输创建 Manager
    pub fn new(config: LLMConfig) -> Result<Self, LLMError> {
        Ok(Self::with_transport(config, default_dyn_transport()?))
    }

    /// 注入自定义传输 测试与代理场景使用
    pub fn with_transport(config: LLMConfig, transport: DynHttpTransport) -> Self {
        Self {
            config: RwLock::new(config),
            transport,
            clients: RwLock::new(HashMap::new()),
            creators: RwLock::new(HashMap::new()),
            store: RwLock::new(None),
        }
    }

    /// 当前配置快照
    pub fn config(&self) -> LLMConfig {
        read_lock(&self.config).clone()
    }

    /// 整体替换配置 已缓存的实例继续服务 直到被 forget
    pub fn set_config(&self, config: LLMConfig) {
        *write_lock(&self.config) = config;
    }

    /// 配置中声明的 Provider 名称列表
    pub fn providers(&self) -> Vec<String> {
        read_lock(&self.config).providers.keys().cloned().collect()
    }

    /// 默认 Provider 名称 未配置时为 `openai`
    pub fn default_provider(&self) -> String {
        read_lock(&self.config)
            .default
            .clone()
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    /// 解析并缓存指定名称的 Provider
    ///
    /// # Errors
    ///
    /// [`LLMError::MissingProviderConfig`] when the name has no configuration
    /// entry, [`LLMError::UnsupportedDriver`] when the entry names a driver
    /// with neither a built-in nor a registered creator, and
    /// [`LLMError::InvalidConfig`] when the entry is incomplete.
    pub fn client(&self, name: &str) -> Result<DynProvider, LLMError> {
        // 查缓存 构建 回填在同一把写锁内完成 同名并发解析只构建一次
        let mut clients = write_lock(&self.clients);
        if let Some(client) = clients.get(name) {
            return Ok(client.clone());
        }

        let config = read_lock(&self.config)
            .providers
            .get(name)
            .cloned()
            .ok_or_else(|| LLMError::MissingProviderConfig {
                name: name.to_string(),
            })?;
        let client = self.build_client(name, &config)?;
        clients.insert(name.to_string(), client.clone());
        tracing::debug!(provider = name, driver = %config.driver, "resolved LLM provider");
        Ok(client)
    }

    /// 默认 Provider 的实例
    pub fn default_client(&self) -> Result<DynProvider, LLMError> {
        self.client(&self.default_provider())
    }

    /// 解析并校验对话能力
    pub fn chat_client(&self, name: &str) -> Result<DynProvider, LLMError> {
        let client = self.client(name)?;
        if client.capabilities().supports_chat {
            Ok(client)
        } else {
            Err(LLMError::UnsupportedCapability {
                provider: name.to_string(),
                capability: Capability::Chat,
            })
        }
    }

    /// 解析并校验图像生成能力
    pub fn image_client(&self, name: &str) -> Result<DynProvider, LLMError> {
        let client = self.client(name)?;
        if client.capabilities().supports_image {
            Ok(client)
        } else {
            Err(LLMError::UnsupportedCapability {
                provider: name.to_string(),
                capability: Capability::Image,
            })
        }
    }

    /// 丢弃某个缓存实例 下次解析时重建
    pub fn forget(&self, name: &str) {
        write_lock(&self.clients).remove(name);
    }

    /// 丢弃全部缓存实例
    pub fn forget_all(&self) {
        write_lock(&self.clients).clear();
    }

    /// 注册自定义 driver 工厂 与内置 driver 同名时优先生效
    ///
    /// 已缓存的实例不受影响 需要 forget 后重建
    pub fn extend<F>(&self, driver: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderConfig) -> Result<DynProvider, LLMError> + Send + Sync + 'static,
    {
        write_lock(&self.creators).insert(driver.into(), Arc::new(factory));
    }

    /// 面向指定 Provider 的借用句柄
    pub fn using(&self, name: impl Into<String>) -> ProviderHandle<'_> {
        ProviderHandle {
            manager: self,
            name: name.into(),
        }
    }

    /// 向默认 Provider 发起对话 返回回复文本
    pub async fn chat(&self, prompt: &str, options: ChatOptions) -> Result<String, LLMError> {
        Ok(self.chat_with_response(prompt, options).await?.content)
    }

    /// 向默认 Provider 发起对话 返回完整响应
    pub async fn chat_with_response(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<ChatResponse, LLMError> {
        let client = self.chat_client(&self.default_provider())?;
        client.chat(prompt, options).await
    }

    /// 向默认 Provider 发起图像生成
    pub async fn generate_image(&self, params: ImageParams) -> Result<ImageResponse, LLMError> {
        let client = self.image_client(&self.default_provider())?;
        client.generate_image(params).await
    }

    /// 以全新 ID 开启默认 Provider 的会话
    pub fn conversation(&self) -> Result<Conversation, LLMError> {
        self.conversation_for(&self.default_provider(), &new_conversation_id())
    }

    /// 绑定既有 ID 开启默认 Provider 的会话
    pub fn conversation_with_id(&self, id: &str) -> Result<Conversation, LLMError> {
        self.conversation_for(&self.default_provider(), id)
    }

    /// 惰性解析配置的会话存储
    ///
    /// # Errors
    ///
    /// [`LLMError::InvalidConfig`] when `conversation.driver` names an unknown
    /// backend.
    pub fn conversation_store(&self) -> Result<DynConversationStore, LLMError> {
        let mut guard = write_lock(&self.store);
        if let Some(store) = guard.as_ref() {
            return Ok(store.clone());
        }

        let driver = read_lock(&self.config).conversation.driver.clone();
        let store: DynConversationStore = match driver.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            other => {
                return Err(LLMError::invalid_config(
                    "conversation.driver",
                    format!("unknown conversation store driver [{other}]"),
                ));
            }
        };
        *guard = Some(store.clone());
        Ok(store)
    }

    /// 注入外部会话存储 例如数据库后端
    pub fn set_conversation_store(&self, store: DynConversationStore) {
        *write_lock(&self.store) = Some(store);
    }

    fn conversation_for(&self, provider: &str, id: &str) -> Result<Conversation, LLMError> {
        let client = self.chat_client(provider)?;
        let store = self.conversation_store()?;
        Ok(Conversation::new(id, provider, client, store))
    }

    fn build_client(&self, name: &str, config: &ProviderConfig) -> Result<DynProvider, LLMError> {
        // 自定义工厂优先 允许覆盖内置 driver
        if let Some(factory) = read_lock(&self.creators).get(&config.driver) {
            return factory(config);
        }

        let client: DynProvider = match config.driver.as_str() {
            "openai" => {
                let api_key = require_api_key(name, config)?;
                let mut provider = OpenAiProvider::new(self.transport.clone(), api_key);
                if let Some(base_url) = &config.base_url {
                    provider = provider.with_base_url(base_url.clone());
                }
                if let Some(model) = &config.chat_model {
                    provider = provider.with_chat_model(model.clone());
                }
                if let Some(model) = &config.image_model {
                    provider = provider.with_image_model(model.clone());
                }
                Arc::new(provider)
            }
            "anthropic" => {
                let api_key = require_api_key(name, config)?;
                let mut provider = AnthropicProvider::new(self.transport.clone(), api_key);
                if let Some(base_url) = &config.base_url {
                    provider = provider.with_base_url(base_url.clone());
                }
                if let Some(model) = &config.chat_model {
                    provider = provider.with_chat_model(model.clone());
                }
                if let Some(Value::String(version)) = config.extra.get("version") {
                    provider = provider.with_version(version.clone());
                }
                Arc::new(provider)
            }
            "lmstudio" => {
                let mut provider = LmStudioProvider::new(self.transport.clone());
                if let Some(host) = &config.host {
                    provider = provider.with_host(host.clone());
                }
                if let Some(port) = config.port {
                    provider = provider.with_port(port);
                }
                if let Some(timeout) = config.timeout {
                    provider = provider.with_timeout(Duration::from_secs(timeout));
                }
                if let Some(api_key) = &config.api_key {
                    provider = provider.with_api_key(api_key.clone());
                }
                if let Some(model) = &config.chat_model {
                    provider = provider.with_chat_model(model.clone());
                }
                Arc::new(provider)
            }
            "dummy" => {
                let mut provider = DummyProvider::new();
                if let Some(response) = &config.chat_response {
                    provider = provider.with_chat_response(response.clone());
                }
                if let Some(url) = &config.image_url {
                    provider = provider.with_image_url(url.clone());
                }
                Arc::new(provider)
            }
            other => {
                return Err(LLMError::UnsupportedDriver {
                    driver: other.to_string(),
                });
            }
        };
        Ok(client)
    }
}

/// 面向单个 Provider 的借用句柄 与 Manager 同等的调用能力
///
/// Holding a handle never changes manager state, so handles for different
/// providers can be used from concurrent tasks without interference.
pub struct ProviderHandle<'a> {
    manager: &'a LLMManager,
    name: String,
}

impl ProviderHandle<'_> {
    /// 句柄指向的 Provider 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 解析句柄对应的实例
    pub fn client(&self) -> Result<DynProvider, LLMError> {
        self.manager.client(&self.name)
    }

    /// 解析并校验对话能力
    pub fn chat_client(&self) -> Result<DynProvider, LLMError> {
        self.manager.chat_client(&self.name)
    }

    /// 解析并校验图像生成能力
    pub fn image_client(&self) -> Result<DynProvider, LLMError> {
        self.manager.image_client(&self.name)
    }

    /// 向该 Provider 发起对话 返回回复文本
    pub async fn chat(&self, prompt: &str, options: ChatOptions) -> Result<String, LLMError> {
        Ok(self.chat_with_response(prompt, options).await?.content)
    }

    /// 向该 Provider 发起对话 返回完整响应
    pub async fn chat_with_response(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<ChatResponse, LLMError> {
        let client = self.chat_client()?;
        client.chat(prompt, options).await
    }

    /// 向该 Provider 发起图像生成
    pub async fn generate_image(&self, params: ImageParams) -> Result<ImageResponse, LLMError> {
        let client = self.image_client()?;
        client.generate_image(params).await
    }

    /// 以全新 ID 开启该 Provider 的会话
    pub fn conversation(&self) -> Result<Conversation, LLMError> {
        self.manager
            .conversation_for(&self.name, &new_conversation_id())
    }

    /// 绑定既有 ID 开启该 Provider 的会话
    pub fn conversation_with_id(&self, id: &str) -> Result<Conversation, LLMError> {
        self.manager.conversation_for(&self.name, id)
    }
}

fn new_conversation_id() -> String {
    format!("conv_{}", Uuid::new_v4())
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    // 锁中毒时继续使用内部状态
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn require_api_key(name: &str, config: &ProviderConfig) -> Result<String, LLMError> {
    config.api_key.clone().ok_or_else(|| {
        LLMError::invalid_config("api_key", format!("provider [{name}] requires an api_key"))
    })
}
