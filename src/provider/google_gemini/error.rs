use std::time::Duration;

use serde::Deserialize;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

use super::provider::PROVIDER_NAME;

/// Parses error responses returned by Google Gemini and Vertex AI.
///
/// Both services use the Google RPC envelope `{error: {code, message, status}}`; the
/// `status` string is checked before the HTTP code.
pub(crate) fn parse_gemini_error(
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
        status: Option<String>,
    }

    // Vertex 偶尔返回数组包裹的错误体
    let parsed = serde_json::from_str::<ErrorBody>(body).ok().or_else(|| {
        serde_json::from_str::<Vec<ErrorBody>>(body)
            .ok()
            .and_then(|bodies| bodies.into_iter().next())
    });
    let Some(error) = parsed.and_then(|parsed| parsed.error) else {
        return LLMError::provider(PROVIDER_NAME, format!("status {status}: {body}"));
    };

    let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
    let rpc_status = error.status.unwrap_or_default();
    if !rpc_status.is_empty() {
        message = format!("{message} ({rpc_status})");
    }

    if looks_like_token_limit_error(None, &message) {
        return LLMError::TokenLimitExceeded { message };
    }

    match (rpc_status.as_str(), status) {
        ("NOT_FOUND", _) | (_, 404) => LLMError::ModelNotFound {
            model: extract_model_identifier(&message),
            message,
        },
        ("UNAUTHENTICATED" | "PERMISSION_DENIED", _) | (_, 401 | 403) => {
            LLMError::Auth { message }
        }
        ("RESOURCE_EXHAUSTED", _) | (_, 429) => LLMError::RateLimit {
            message,
            retry_after,
        },
        ("INVALID_ARGUMENT" | "FAILED_PRECONDITION", _) | (_, 400) => {
            LLMError::Validation { message }
        }
        _ => LLMError::provider(PROVIDER_NAME, message),
    }
}
