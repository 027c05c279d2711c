use std::time::Duration;

use thiserror::Error;

/// Aggregates every failure mode exposed by `send_prompt`.
///
/// Vendor failures are normalized into the variants below and propagated as-is; the
/// crate never retries or degrades to a partial response.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Reports invalid or missing credentials.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// Indicates that the vendor throttled the request.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Raw message returned by the vendor.
        message: String,
        /// Optional wait duration suggested by the vendor before retrying.
        retry_after: Option<Duration>,
    },
    /// Indicates that the prompt or expected completion exceeds the allowed token budget.
    #[error("token limit exceeded: {message}")]
    TokenLimitExceeded { message: String },
    /// Caller-contract failures: invalid messages, streaming policy violations and
    /// malformed requests rejected by the vendor.
    #[error("{message}")]
    Validation { message: String },
    /// Indicates that a requested model or deployment could not be resolved.
    #[error("model not found: {message}")]
    ModelNotFound {
        /// Model identifier extracted from the error payload when available.
        model: Option<String>,
        /// Full error message returned by the vendor for debugging.
        message: String,
    },
    /// Raised when provider options are incomplete or inconsistent.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// The provider identifier is not part of the known set.
    #[error("Provider {provider} is not supported yet")]
    UnsupportedProvider { provider: String },
    /// Wraps vendor-defined errors that cannot be normalized.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the wire schema, such as `openai_chat`.
        provider: &'static str,
        /// Human-readable error message returned by the vendor.
        message: String,
    },
    /// Dispatcher and transformer disagree about the target schema.
    #[error("{message}")]
    Internal { message: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given schema name and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::error::LLMError;
    ///
    /// let err = LLMError::provider("openai_chat", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai_chat", .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Validation`].
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Returns `true` when an error code or message suggests a context/window overflow.
pub(crate) fn looks_like_token_limit_error(code_hint: Option<&str>, message: &str) -> bool {
    if let Some(code) = code_hint {
        let lower = code.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "context_length_exceeded"
                | "max_context_length_exceeded"
                | "prompt_tokens_exceeded"
                | "context_window_exceeded"
        ) {
            return true;
        }
    }

    let lower_message = message.to_ascii_lowercase();
    const HINTS: [&str; 6] = [
        "context length",
        "context window",
        "token limit",
        "maximum output tokens",
        "max output tokens",
        "prompt is too long",
    ];
    HINTS.iter().any(|needle| lower_message.contains(needle))
}

/// Attempts to extract a model identifier quoted inside an error message.
pub(crate) fn extract_model_identifier(message: &str) -> Option<String> {
    ['`', '"', '\''].into_iter().find_map(|delimiter| {
        let start = message.find(delimiter)? + delimiter.len_utf8();
        let end = start + message[start..].find(delimiter)?;
        let value = message[start..end].trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
