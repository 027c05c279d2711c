use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

use super::provider::PROVIDER_NAME;

/// Parses error responses returned by the Anthropic Messages API.
///
/// Classification prefers the `error.type` field and falls back to the HTTP status.
pub(crate) fn parse_anthropic_error(
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
        #[serde(rename = "type")]
        kind: Option<String>,
    }

    let Some(error) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
    else {
        return LLMError::provider(PROVIDER_NAME, format!("status {status}: {body}"));
    };

    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    let kind = error.kind.unwrap_or_default();
    if !kind.is_empty() {
        message = format!("{message} ({kind})");
    }

    if looks_like_token_limit_error(None, &message) {
        return LLMError::TokenLimitExceeded { message };
    }

    match (kind.as_str(), status) {
        ("not_found_error", _) | (_, 404) => LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        },
        ("authentication_error" | "permission_error", _) | (_, 401 | 403) => {
            LLMError::Auth { message }
        }
        ("rate_limit_error", _) | (_, 429) => LLMError::RateLimit {
            message,
            retry_after,
        },
        ("invalid_request_error", _) | (_, 400) => LLMError::Validation { message },
        _ => LLMError::provider(PROVIDER_NAME, message),
    }
}
