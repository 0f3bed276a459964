use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::LLMError;
use crate::store::ConversationStore;
use crate::types::Message;

#[derive(Default)]
struct ConversationRecord {
    messages: Vec<Message>,
    system_prompt: Option<String>,
}

/// Process-local [`ConversationStore`] backed by a `HashMap`.
///
/// The default store for tests and single-process deployments. History lives
/// only as long as the process; nothing is written to disk.
///
/// # Examples
///
/// ```
/// use kaiwa_llm::store::ConversationStore;
/// use kaiwa_llm::store::memory::MemoryStore;
/// use kaiwa_llm::types::Message;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// store.add_message("conv_1", Message::user("hello")).await.unwrap();
///
/// let history = store.messages("conv_1").await.unwrap();
/// assert_eq!(history.len(), 1);
/// assert_eq!(history[0].content, "hello");
/// # });
/// ```
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ConversationRecord>>,
}

impl MemoryStore {
    /// 创建空的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ConversationRecord>> {
        // 锁中毒时继续使用内部状态
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ConversationRecord>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, LLMError> {
        Ok(self
            .read()
            .get(conversation_id)
            .map(|record| record.messages.clone())
            .unwrap_or_default())
    }

    async fn save_messages(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), LLMError> {
        let mut records = self.write();
        let record = records.entry(conversation_id.to_string()).or_default();
        record.messages = messages.to_vec();
        Ok(())
    }

    async fn add_message(&self, conversation_id: &str, message: Message) -> Result<(), LLMError> {
        // 读取与追加在同一把写锁内完成 并发追加不会互相覆盖
        let mut records = self.write();
        records
            .entry(conversation_id.to_string())
            .or_default()
            .messages
            .push(message);
        Ok(())
    }

    async fn system_prompt(&self, conversation_id: &str) -> Result<Option<String>, LLMError> {
        Ok(self
            .read()
            .get(conversation_id)
            .and_then(|record| record.system_prompt.clone()))
    }

    async fn set_system_prompt(
        &self,
        conversation_id: &str,
        prompt: &str,
    ) -> Result<(), LLMError> {
        let mut records = self.write();
        let record = records.entry(conversation_id.to_string()).or_default();
        record.system_prompt = Some(prompt.to_string());
        Ok(())
    }

    async fn exists(&self, conversation_id: &str) -> Result<bool, LLMError> {
        Ok(self.read().contains_key(conversation_id))
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), LLMError> {
        // 未知会话静默返回 不创建记录
        if let Some(record) = self.write().get_mut(conversation_id) {
            record.messages.clear();
        }
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), LLMError> {
        self.write().remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::Role;

    #[tokio::test]
    async fn append_preserves_order() {
        let store = MemoryStore::new();
        store
            .add_message("conv_a", Message::user("first"))
            .await
            .unwrap();
        store
            .add_message("conv_a", Message::assistant("second"))
            .await
            .unwrap();

        let history = store.messages("conv_a").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "second");
    }

    #[tokio::test]
    async fn save_messages_replaces_history() {
        let store = MemoryStore::new();
        store
            .add_message("conv_a", Message::user("old"))
            .await
            .unwrap();

        store
            .save_messages("conv_a", &[Message::user("new")])
            .await
            .unwrap();

        let history = store.messages("conv_a").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "new");
    }

    #[tokio::test]
    async fn first_write_creates_record() {
        let store = MemoryStore::new();
        assert!(!store.exists("conv_a").await.unwrap());

        store
            .add_message("conv_a", Message::user("hi"))
            .await
            .unwrap();
        assert!(store.exists("conv_a").await.unwrap());

        // set_system_prompt 同样触发隐式创建
        store.set_system_prompt("conv_b", "be brief").await.unwrap();
        assert!(store.exists("conv_b").await.unwrap());
    }

    #[tokio::test]
    async fn clear_keeps_record_and_system_prompt() {
        let store = MemoryStore::new();
        store.set_system_prompt("conv_a", "be brief").await.unwrap();
        store
            .add_message("conv_a", Message::user("hi"))
            .await
            .unwrap();

        store.clear("conv_a").await.unwrap();

        assert!(store.messages("conv_a").await.unwrap().is_empty());
        assert!(store.exists("conv_a").await.unwrap());
        assert_eq!(
            store.system_prompt("conv_a").await.unwrap().as_deref(),
            Some("be brief")
        );
    }

    #[tokio::test]
    async fn clear_unknown_conversation_is_silent() {
        let store = MemoryStore::new();
        store.clear("missing").await.unwrap();
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_everything() {
        let store = MemoryStore::new();
        store.set_system_prompt("conv_a", "be brief").await.unwrap();
        store
            .add_message("conv_a", Message::user("hi"))
            .await
            .unwrap();

        store.delete("conv_a").await.unwrap();

        assert!(!store.exists("conv_a").await.unwrap());
        assert!(store.messages("conv_a").await.unwrap().is_empty());
        assert!(store.system_prompt("conv_a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let store = MemoryStore::new();
        store
            .add_message("conv_a", Message::user("for a"))
            .await
            .unwrap();
        store
            .add_message("conv_b", Message::user("for b"))
            .await
            .unwrap();

        assert_eq!(store.messages("conv_a").await.unwrap().len(), 1);
        assert_eq!(store.messages("conv_b").await.unwrap().len(), 1);
        assert_eq!(store.messages("conv_a").await.unwrap()[0].content, "for a");
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for task in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for turn in 0..25 {
                    store
                        .add_message("conv_shared", Message::user(format!("{task}-{turn}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.expect("append task should not panic");
        }

        // 8 个任务各追加 25 条 一条不丢
        assert_eq!(store.messages("conv_shared").await.unwrap().len(), 200);
    }
}
