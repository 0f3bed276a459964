use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::types::Message;

/// Persistence interface for conversation history.
///
/// A store keeps one record per conversation id: an ordered message list plus
/// an optional system prompt. Records are created implicitly on first write,
/// so callers never register a conversation up front.
///
/// All methods take `&self`; implementations are expected to synchronize
/// internally so a store handle can be shared across tasks.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the full history, empty when the conversation is unknown.
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, LLMError>;

    /// Replaces the history wholesale.
    async fn save_messages(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), LLMError>;

    /// Appends one message to the history.
    ///
    /// The append must be atomic with respect to concurrent appends on the
    /// same conversation: no interleaving writer may observe or produce a
    /// partially updated record.
    async fn add_message(&self, conversation_id: &str, message: Message) -> Result<(), LLMError>;

    /// Returns the stored system prompt, if any.
    async fn system_prompt(&self, conversation_id: &str) -> Result<Option<String>, LLMError>;

    /// Sets or replaces the system prompt.
    async fn set_system_prompt(
        &self,
        conversation_id: &str,
        prompt: &str,
    ) -> Result<(), LLMError>;

    /// Reports whether a record exists for the conversation.
    async fn exists(&self, conversation_id: &str) -> Result<bool, LLMError>;

    /// Empties the message list but keeps the record and its system prompt.
    ///
    /// Clearing an unknown conversation succeeds without creating a record.
    async fn clear(&self, conversation_id: &str) -> Result<(), LLMError>;

    /// Removes the record entirely, including the system prompt.
    async fn delete(&self, conversation_id: &str) -> Result<(), LLMError>;
}

/// Thread-safe handle to a store implementation.
pub type DynConversationStore = Arc<dyn ConversationStore>;

pub mod memory;
