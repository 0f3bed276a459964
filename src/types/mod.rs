//! Shared data structures modeling chat and image exchanges.
//!
//! These types normalize provider-specific payloads so the rest of the crate
//! can stay agnostic of individual API differences.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat role accepted by every built-in provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction-level message that frames the assistant behavior.
    System,
    /// Message authored by the end user.
    User,
    /// Message authored by the model.
    Assistant,
}

/// Normalized chat message shared across providers.
///
/// Messages serialize to the `{"role": ..., "content": ...}` wire shape used
/// verbatim by OpenAI-compatible APIs, so a `Vec<Message>` can be embedded
/// directly into a request payload.
///
/// # Examples
///
/// ```
/// use kaiwa_llm::types::{Message, Role};
///
/// let msg = Message::user("Summarize Rust traits.");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.content, "Summarize Rust traits.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role associated with this message.
    pub role: Role,
    /// Plain UTF-8 text content.
    pub content: String,
}

impl Message {
    /// Creates a message with an explicit role.
    pub fn new<T: Into<String>>(role: Role, content: T) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system-role message.
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user-role message.
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant-role message.
    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Token usage metrics collected from a provider response.
///
/// Vendors disagree on field names (`prompt_tokens`/`completion_tokens` versus
/// `input_tokens`/`output_tokens`) and some omit the total; [`TokenUsage::new`]
/// and [`TokenUsage::from_json`] normalize both so downstream accounting only
/// ever sees one shape.
///
/// # Examples
///
/// ```
/// use kaiwa_llm::types::TokenUsage;
///
/// // 厂商缺省 total 时本地补全
/// let usage = TokenUsage::new(120, 30, 0);
/// assert_eq!(usage.total_tokens, 150);
///
/// // 厂商给出的 total 原样保留
/// let reported = TokenUsage::new(120, 30, 151);
/// assert_eq!(reported.total_tokens, 151);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt side of the exchange.
    pub prompt_tokens: u64,
    /// Tokens generated in the completion.
    pub completion_tokens: u64,
    /// Total tokens across prompt and completion.
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Creates a usage record, deriving the total from the components when the
    /// vendor did not report one.
    ///
    /// A non-zero vendor-supplied total is always kept verbatim, even when it
    /// disagrees with the component sum.
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        let total_tokens = if total_tokens == 0 && (prompt_tokens > 0 || completion_tokens > 0) {
            prompt_tokens + completion_tokens
        } else {
            total_tokens
        };
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// Extracts usage from a raw vendor `usage` object.
    ///
    /// Accepts both the OpenAI-style and the Anthropic-style field names.
    /// Missing, non-integer, or negative fields count as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use kaiwa_llm::types::TokenUsage;
    /// use serde_json::json;
    ///
    /// let usage = TokenUsage::from_json(&json!({"input_tokens": 9, "output_tokens": 4}));
    /// assert_eq!(usage.total_tokens, 13);
    /// ```
    pub fn from_json(value: &Value) -> Self {
        let field = |primary: &str, fallback: &str| {
            value
                .get(primary)
                .and_then(Value::as_u64)
                .or_else(|| value.get(fallback).and_then(Value::as_u64))
                .unwrap_or(0)
        };
        Self::new(
            field("prompt_tokens", "input_tokens"),
            field("completion_tokens", "output_tokens"),
            value
                .get("total_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        )
    }

    /// Returns a zero-valued usage record.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` when any counter is non-zero.
    pub fn has_data(&self) -> bool {
        self.prompt_tokens > 0 || self.completion_tokens > 0 || self.total_tokens > 0
    }
}

/// Normalized chat response returned by a provider.
///
/// `raw` retains the full vendor payload for anything the normalized fields do
/// not cover; `token_usage` is always present and zero-valued when the vendor
/// omitted usage accounting.
///
/// # Examples
///
/// ```
/// use kaiwa_llm::types::{ChatResponse, TokenUsage};
/// use serde_json::json;
///
/// let response = ChatResponse {
///     content: "Hello".to_string(),
///     raw: json!({"id": "chatcmpl-1"}),
///     model: Some("gpt-4.1-mini".to_string()),
///     id: Some("chatcmpl-1".to_string()),
///     latency_ms: Some(412.5),
///     token_usage: TokenUsage::new(9, 1, 0),
/// };
/// assert!(!response.is_empty());
/// assert_eq!(response.to_string(), "Hello");
/// assert_eq!(response.total_tokens(), 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Normalized assistant text, empty when the vendor returned none.
    pub content: String,
    /// Full vendor payload kept verbatim.
    pub raw: Value,
    /// Effective model identifier reported by the provider.
    pub model: Option<String>,
    /// Upstream response identifier.
    pub id: Option<String>,
    /// Wall-clock duration of the HTTP exchange in milliseconds.
    pub latency_ms: Option<f64>,
    /// Token usage accounting, zero-valued when unreported.
    pub token_usage: TokenUsage,
}

impl ChatResponse {
    /// Returns `true` when the normalized content is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Prompt-side token count.
    pub fn prompt_tokens(&self) -> u64 {
        self.token_usage.prompt_tokens
    }

    /// Completion-side token count.
    pub fn completion_tokens(&self) -> u64 {
        self.token_usage.completion_tokens
    }

    /// Total token count.
    pub fn total_tokens(&self) -> u64 {
        self.token_usage.total_tokens
    }
}

impl fmt::Display for ChatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Normalized image-generation response.
///
/// Depending on the vendor `response_format`, exactly one of `url` and
/// `base64` is populated by the built-in providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Hosted URL of the generated image, when the vendor returned one.
    pub url: Option<String>,
    /// Base64-encoded image bytes, when requested via `response_format`.
    pub base64: Option<String>,
    /// Full vendor payload kept verbatim.
    pub raw: Value,
    /// Prompt rewrite applied by the vendor, when reported.
    pub revised_prompt: Option<String>,
}

/// Tunable chat options accepted by every provider.
///
/// Every field is optional so callers only set the knobs they care about.
/// Each provider forwards the subset its vendor understands and ignores the
/// rest; in particular `system` placement is vendor-specific and handled by
/// the individual request builders.
///
/// # Examples
///
/// ```
/// use kaiwa_llm::types::ChatOptions;
///
/// let options = ChatOptions {
///     temperature: Some(0.3),
///     max_tokens: Some(256),
///     ..Default::default()
/// };
/// assert!(options.model.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    /// Full message history; when present it replaces the single prompt.
    pub messages: Option<Vec<Message>>,
    /// System prompt; placement (head message vs. top-level field) is decided
    /// per vendor.
    pub system: Option<String>,
    /// Model identifier override.
    pub model: Option<String>,
    /// Sampling temperature, typically within `0.0..=2.0`.
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter where `1.0` disables the filter.
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff; only Anthropic-style vendors consume it.
    pub top_k: Option<u32>,
    /// Maximum number of output tokens returned by the provider.
    pub max_tokens: Option<u32>,
    /// Stop sequences; only local OpenAI-compatible servers consume them.
    pub stop: Option<Vec<String>>,
}

/// Parameters for an image-generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageParams {
    /// Prompt describing the image to generate.
    pub prompt: String,
    /// Model identifier override.
    pub model: Option<String>,
    /// Image dimensions such as `1024x1024`.
    pub size: Option<String>,
    /// Number of images to generate; vendors default to one.
    pub n: Option<u32>,
    /// Vendor quality preset such as `hd`.
    pub quality: Option<String>,
    /// Vendor style preset such as `vivid` or `natural`.
    pub style: Option<String>,
    /// Payload delivery format, `url` or `b64_json`.
    pub response_format: Option<String>,
}

impl ImageParams {
    /// Creates params carrying just a prompt, leaving every knob at the
    /// vendor default.
    pub fn new<T: Into<String>>(prompt: T) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Capabilities a provider can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Conversational text completion.
    Chat,
    /// Image generation.
    Image,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Chat => f.write_str("chat"),
            Capability::Image => f.write_str("image generation"),
        }
    }
}

/// Capability descriptor used to filter providers at runtime.
///
/// [`crate::manager::LLMManager`] consults the descriptor before dispatching a
/// request so capability mismatches fail without any network traffic.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Whether conversational chat is supported.
    pub supports_chat: bool,
    /// Whether image generation is supported.
    pub supports_image: bool,
}

impl CapabilityDescriptor {
    /// Returns `true` when the given capability is available.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Chat => self.supports_chat,
            Capability::Image => self.supports_image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::System).unwrap(), json!("system"));
        assert_eq!(serde_json::to_value(Role::User).unwrap(), json!("user"));
        assert_eq!(
            serde_json::to_value(Role::Assistant).unwrap(),
            json!("assistant")
        );
    }

    #[test]
    fn message_serializes_to_wire_shape() {
        let value = serde_json::to_value(Message::user("你好")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "你好"}));
    }

    #[test]
    fn token_usage_derives_missing_total() {
        let usage = TokenUsage::new(10, 5, 0);
        assert_eq!(usage.total_tokens, 15);
        assert!(usage.has_data());
    }

    #[test]
    fn token_usage_keeps_vendor_total() {
        // 厂商统计口径不同也不覆盖
        let usage = TokenUsage::new(10, 5, 99);
        assert_eq!(usage.total_tokens, 99);
    }

    #[test]
    fn token_usage_all_zero_stays_zero() {
        let usage = TokenUsage::new(0, 0, 0);
        assert_eq!(usage.total_tokens, 0);
        assert!(!usage.has_data());
        assert_eq!(usage, TokenUsage::empty());
    }

    #[test]
    fn token_usage_reads_openai_field_names() {
        let usage = TokenUsage::from_json(&json!({
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 21
        }));
        assert_eq!(usage.prompt_tokens, 9);
        assert_eq!(usage.completion_tokens, 12);
        assert_eq!(usage.total_tokens, 21);
    }

    #[test]
    fn token_usage_reads_anthropic_field_names() {
        let usage = TokenUsage::from_json(&json!({"input_tokens": 7, "output_tokens": 3}));
        assert_eq!(usage.prompt_tokens, 7);
        assert_eq!(usage.completion_tokens, 3);
        assert_eq!(usage.total_tokens, 10);
    }

    #[test]
    fn token_usage_tolerates_garbage_fields() {
        let usage = TokenUsage::from_json(&json!({
            "prompt_tokens": "many",
            "completion_tokens": -3,
            "unrelated": true
        }));
        assert_eq!(usage, TokenUsage::empty());
        assert!(!usage.has_data());
    }

    #[test]
    fn chat_response_displays_content() {
        let response = ChatResponse {
            content: "答案是 42".to_string(),
            raw: json!({}),
            model: None,
            id: None,
            latency_ms: None,
            token_usage: TokenUsage::empty(),
        };
        assert_eq!(response.to_string(), "答案是 42");
        assert!(!response.is_empty());
        assert_eq!(response.total_tokens(), 0);
    }

    #[test]
    fn capability_descriptor_lookup() {
        let descriptor = CapabilityDescriptor {
            supports_chat: true,
            supports_image: false,
        };
        assert!(descriptor.supports(Capability::Chat));
        assert!(!descriptor.supports(Capability::Image));
        assert_eq!(Capability::Image.to_string(), "image generation");
    }
}
