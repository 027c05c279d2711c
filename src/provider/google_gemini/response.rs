use crate::error::LLMError;
use crate::provider::ProviderReply;
use crate::reasoning::extract_reasoning;
use crate::types::FunctionCall;
use crate::usage;

use super::provider::PROVIDER_NAME;
use super::types::GeminiGenerateContentResponse;

/// 缺省的函数调用 id 与名称
const FALLBACK_CALL_NAME: &str = "function_call";

pub(crate) fn map_response(resp: GeminiGenerateContentResponse) -> Result<ProviderReply, LLMError> {
    if let Some(error) = &resp.error {
        return Err(LLMError::provider(PROVIDER_NAME, error.to_string()));
    }

    let text = resp.text();
    let tool_calls = resp
        .first_candidate_parts()
        .iter()
        .filter_map(|part| part.function_call.as_ref())
        .map(|call| {
            FunctionCall::new(
                call.id.as_deref().unwrap_or(FALLBACK_CALL_NAME),
                call.name.as_deref().unwrap_or(FALLBACK_CALL_NAME),
                serde_json::Value::Object(call.args.clone()).to_string(),
            )
        })
        .collect();
    let extracted = extract_reasoning(None, &text);

    Ok(ProviderReply {
        content: extracted.content,
        reasoning: extracted.reasoning,
        tool_calls,
        usage: resp.usage_metadata.as_ref().map(usage::from_google),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> GeminiGenerateContentResponse {
        serde_json::from_value(value).expect("valid response")
    }

    #[test]
    fn thought_parts_are_excluded_from_content() {
        let reply = map_response(parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Let me think", "thought": true},
                    {"text": "The answer "},
                    {"text": "is 4"}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 8,
                "candidatesTokenCount": 4,
                "thoughtsTokenCount": 20,
                "totalTokenCount": 32
            }
        })))
        .expect("reply");
        assert_eq!(reply.content, "The answer is 4");
        let usage = reply.usage.expect("usage");
        assert_eq!(usage.completion_tokens, 24);
        assert_eq!(
            usage.completion_tokens,
            usage.completion_tokens_without_thoughts + usage.thoughts_tokens
        );
        assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
    }

    #[test]
    fn function_calls_get_defaults_and_string_arguments() {
        let reply = map_response(parse(json!({
            "candidates": [{"content": {"parts": [
                {"functionCall": {"name": "get_weather", "args": {"city": "Paris"}}},
                {"functionCall": {"id": "c2", "args": {}}}
            ]}}]
        })))
        .expect("reply");
        assert_eq!(reply.content, "");
        assert_eq!(
            reply.tool_calls,
            vec![
                FunctionCall::new("function_call", "get_weather", r#"{"city":"Paris"}"#),
                FunctionCall::new("c2", "function_call", "{}"),
            ]
        );
    }

    #[test]
    fn empty_candidates_yield_empty_content() {
        let reply = map_response(parse(json!({"candidates": []}))).expect("reply");
        assert_eq!(reply.content, "");
        assert!(reply.tool_calls.is_empty());
        assert!(reply.usage.is_none());
    }
}
