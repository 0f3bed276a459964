//! 多提供商 LLM 对话与图像生成统一封装库

pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod manager;
pub mod provider;
pub mod store;
pub mod types;

pub use config::{ConversationConfig, LLMConfig, ProviderConfig};
pub use conversation::{Conversation, ConversationExport};
pub use error::LLMError;
pub use manager::{DriverFactory, LLMManager, ProviderHandle};
pub use provider::{DynProvider, LLMProvider};
pub use store::memory::MemoryStore;
pub use store::{ConversationStore, DynConversationStore};
pub use types::*;
