use thiserror::Error;

use crate::types::Capability;

/// Aggregates every failure mode exposed by the LLM suite.
///
/// Callers can match on the specific variant to decide whether to fall back to
/// another provider, fix their configuration, or surface an actionable message
/// to the user interface.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Raised when a provider name has no entry in the configuration.
    #[error("missing configuration for LLM provider [{name}]")]
    MissingProviderConfig {
        /// Provider name as requested from the manager.
        name: String,
    },
    /// Raised when a configured driver kind has neither a built-in factory nor
    /// a registered custom creator.
    #[error("unsupported LLM driver [{driver}]")]
    UnsupportedDriver {
        /// Driver kind string taken from the provider configuration.
        driver: String,
    },
    /// Declares that a capability is not supported by the selected provider.
    #[error("LLM provider [{provider}] does not support {capability}")]
    UnsupportedCapability {
        /// Name of the provider the call was routed to.
        provider: String,
        /// The capability that was requested but is unavailable.
        capability: Capability,
    },
    /// Reports a non-success HTTP response from a vendor API.
    #[error("{provider} request failed with status {status}: {body}")]
    RequestFailed {
        /// Name of the provider, such as `openai`.
        provider: &'static str,
        /// HTTP status code returned by the vendor.
        status: u16,
        /// Raw response body, kept verbatim for debugging.
        body: String,
    },
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Wraps provider-defined errors that cannot be normalized, such as
    /// payloads that fail to parse.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider, such as `anthropic`.
        provider: &'static str,
        /// Human-readable error message.
        message: String,
    },
    /// Signals validation or serialization failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Surfaces failures from a conversation store backend.
    ///
    /// The built-in in-memory store never fails; this variant exists for
    /// external backends (database, session, ...) implementing
    /// [`ConversationStore`](crate::store::ConversationStore).
    #[error("conversation store error: {message}")]
    Store { message: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// The helper keeps call sites concise and guarantees consistent
    /// formatting of transport failures across the crate.
    ///
    /// # Examples
    ///
    /// ```
    /// use kaiwa_llm::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given provider name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use kaiwa_llm::error::LLMError;
    ///
    /// let err = LLMError::provider("openai", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Validation`] from a textual description.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Store`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use kaiwa_llm::error::LLMError;
    ///
    /// let err = LLMError::store("connection pool exhausted");
    /// assert!(matches!(err, LLMError::Store { .. }));
    /// ```
    pub fn store<T: Into<String>>(message: T) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::InvalidConfig`] for the given field.
    pub fn invalid_config<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
