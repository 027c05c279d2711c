use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

use super::provider::PROVIDER_NAME;

/// Parses error responses returned by Chat Completions compatible backends.
pub(crate) fn parse_openai_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<Value>,
    }

    let Some(error) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
    else {
        return LLMError::provider(PROVIDER_NAME, format!("status {status}: {body}"));
    };

    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    // Azure 与部分中转返回数字 code
    let code = error.code.map(|code| match code {
        Value::String(text) => text,
        other => other.to_string(),
    });
    if let Some(code) = &code {
        message = format!("{message} ({code})");
    }
    let code_hint = code.as_deref();

    if looks_like_token_limit_error(code_hint, &message) {
        return LLMError::TokenLimitExceeded { message };
    }
    if status == 404
        || matches!(code_hint, Some("model_not_found" | "DeploymentNotFound"))
    {
        return LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        };
    }

    match status {
        401 | 403 => LLMError::Auth { message },
        429 => LLMError::RateLimit {
            message,
            retry_after,
        },
        400 | 422 => LLMError::Validation { message },
        _ => LLMError::provider(PROVIDER_NAME, message),
    }
}
