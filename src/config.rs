use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 顶层配置 描述默认 Provider 与全部可用后端
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMConfig {
    /// 缺省 Provider 名称 未设置时回落到 `openai`
    pub default: Option<String>,
    /// 以名称索引的 Provider 配置表
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// 单个 Provider 的配置 字段按 driver 择需填写
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 驱动名 例如 `openai` `anthropic` `lmstudio` `dummy`
    pub driver: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub chat_model: Option<String>,
    pub image_model: Option<String>,
    /// lmstudio 使用的主机与端口
    pub host: Option<String>,
    pub port: Option<u16>,
    /// 请求超时 秒
    pub timeout: Option<u64>,
    /// dummy 使用的预设回复与图像地址
    pub chat_response: Option<String>,
    pub image_url: Option<String>,
    /// 附加设置 例如 organization 或 version
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// 会话存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// 存储驱动 目前内置 `memory`
    #[serde(default = "default_conversation_driver")]
    pub driver: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            driver: default_conversation_driver(),
        }
    }
}

fn default_conversation_driver() -> String {
    "memory".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 覆盖四种内置 driver 的完整配置都能反序列化
    #[test]
    fn deserializes_full_config() {
        let config: LLMConfig = serde_json::from_value(json!({
            "default": "openai",
            "providers": {
                "openai": {
                    "driver": "openai",
                    "api_key": "sk-test",
                    "chat_model": "gpt-4.1-mini",
                    "image_model": "dall-e-3"
                },
                "anthropic": {
                    "driver": "anthropic",
                    "api_key": "sk-ant-test",
                    "base_url": "https://proxy.internal/v1"
                },
                "local": {
                    "driver": "lmstudio",
                    "host": "10.0.0.5",
                    "port": 8080,
                    "timeout": 300
                },
                "test": {
                    "driver": "dummy",
                    "chat_response": "fixed"
                }
            },
            "conversation": {"driver": "memory"}
        }))
        .expect("config should deserialize");

        assert_eq!(config.default.as_deref(), Some("openai"));
        assert_eq!(config.providers.len(), 4);

        let openai = &config.providers["openai"];
        assert_eq!(openai.driver, "openai");
        assert_eq!(openai.api_key.as_deref(), Some("sk-test"));

        let local = &config.providers["local"];
        assert_eq!(local.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(local.port, Some(8080));
        assert_eq!(local.timeout, Some(300));

        assert_eq!(
            config.providers["test"].chat_response.as_deref(),
            Some("fixed")
        );
        assert_eq!(config.conversation.driver, "memory");
    }

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let config: LLMConfig = serde_json::from_value(json!({})).expect("empty object is valid");

        assert!(config.default.is_none());
        assert!(config.providers.is_empty());
        // 会话存储缺省使用内存驱动
        assert_eq!(config.conversation.driver, "memory");
    }

    #[test]
    fn provider_entry_requires_driver() {
        let result: Result<ProviderConfig, _> =
            serde_json::from_value(json!({"api_key": "sk-test"}));
        assert!(result.is_err(), "driver is mandatory for provider entries");
    }

    #[test]
    fn extra_settings_are_preserved() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "driver": "openai",
            "api_key": "sk-test",
            "extra": {"organization": "org-1", "project": "proj-2"}
        }))
        .expect("config should deserialize");

        assert_eq!(config.extra["organization"], json!("org-1"));
        assert_eq!(config.extra["project"], json!("proj-2"));
    }
}
