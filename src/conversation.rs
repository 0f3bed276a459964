use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::provider::DynProvider;
use crate::store::DynConversationStore;
use crate::types::{ChatOptions, ChatResponse, Message};

/// 有状态会话 绑定一个 Provider 与一个存储后端
///
/// Cloning is cheap and yields a handle onto the same conversation: both
/// clones read and write the same record in the backing store.
#[derive(Clone)]
pub struct Conversation {
    id: String,
    provider: String,
    client: DynProvider,
    store: DynConversationStore,
}

impl Conversation {
    /// 创建会话句柄 记录按 id 在存储中惰性建立
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<String>,
        client: DynProvider,
        store: DynConversationStore,
    ) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            client,
            store,
        }
    }

    /// 会话 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 创建该会话时指定的 Provider 名称
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// 底层 Provider 句柄
    pub fn client(&self) -> DynProvider {
        self.client.clone()
    }

    /// 设置系统提示词 立即持久化
    pub async fn system(&self, prompt: &str) -> Result<(), LLMError> {
        self.store.set_system_prompt(&self.id, prompt).await
    }

    /// 读取已存储的系统提示词
    pub async fn system_prompt(&self) -> Result<Option<String>, LLMError> {
        self.store.system_prompt(&self.id).await
    }

    /// 追加用户消息 携带全量历史调用模型 并把回复写回存储
    ///
    /// The stored history always wins: any `options.messages` supplied by the
    /// caller is replaced with the conversation's own record, which at that
    /// point already ends with the new user message. The provider therefore
    /// receives an empty prompt string; the message sequence carries all
    /// content. A stored system prompt is injected only when the caller did
    /// not set one.
    ///
    /// The turn is not transactional. The user message is persisted before
    /// the provider call, so a failed call leaves it in history and retrying
    /// the same prompt appends a second copy rather than replacing the first.
    pub async fn chat(
        &self,
        prompt: &str,
        mut options: ChatOptions,
    ) -> Result<ChatResponse, LLMError> {
        self.store
            .add_message(&self.id, Message::user(prompt))
            .await?;

        let history = self.store.messages(&self.id).await?;
        options.messages = Some(history);
        if options.system.is_none() {
            options.system = self.store.system_prompt(&self.id).await?;
        }

        let response = self.client.chat("", options).await?;
        self.store
            .add_message(&self.id, Message::assistant(response.content.clone()))
            .await?;
        Ok(response)
    }

    /// 直接追加一条消息 不触发模型调用
    pub async fn add_message(&self, message: Message) -> Result<(), LLMError> {
        self.store.add_message(&self.id, message).await
    }

    /// 全量历史
    pub async fn messages(&self) -> Result<Vec<Message>, LLMError> {
        self.store.messages(&self.id).await
    }

    /// 历史消息条数
    pub async fn message_count(&self) -> Result<usize, LLMError> {
        Ok(self.messages().await?.len())
    }

    /// 是否已有历史
    pub async fn has_messages(&self) -> Result<bool, LLMError> {
        Ok(!self.messages().await?.is_empty())
    }

    /// 最近一条消息
    pub async fn last_message(&self) -> Result<Option<Message>, LLMError> {
        Ok(self.messages().await?.pop())
    }

    /// 最近 count 条消息 顺序保持
    pub async fn last_messages(&self, count: usize) -> Result<Vec<Message>, LLMError> {
        let messages = self.messages().await?;
        let skip = messages.len().saturating_sub(count);
        Ok(messages.into_iter().skip(skip).collect())
    }

    /// 整体替换历史 用于恢复既有会话
    pub async fn load_history(&self, messages: Vec<Message>) -> Result<(), LLMError> {
        self.store.save_messages(&self.id, &messages).await
    }

    /// 清空历史 保留会话与系统提示词
    pub async fn clear(&self) -> Result<(), LLMError> {
        self.store.clear(&self.id).await
    }

    /// 删除整个会话记录
    pub async fn delete(&self) -> Result<(), LLMError> {
        self.store.delete(&self.id).await
    }

    /// 导出会话快照
    pub async fn export(&self) -> Result<ConversationExport, LLMError> {
        Ok(ConversationExport {
            id: self.id.clone(),
            provider: self.provider.clone(),
            system_prompt: self.system_prompt().await?,
            messages: self.messages().await?,
        })
    }
}

/// 会话导出快照 可序列化归档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationExport {
    pub id: String,
    pub provider: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
}
