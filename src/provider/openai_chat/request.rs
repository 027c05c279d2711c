use serde_json::{Map, Value, json};

use crate::config::OpenRouterRouting;
use crate::error::LLMError;
use crate::provider::ProviderRequest;
use crate::types::ToolCallMode;

use super::provider::OpenAiReasoning;

pub(crate) fn build_openai_body(
    request: &ProviderRequest,
    reasoning: Option<OpenAiReasoning>,
    routing: Option<&OpenRouterRouting>,
    stream: bool,
) -> Result<Value, LLMError> {
    let messages = request.messages.clone().into_openai()?;

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert("messages".to_string(), to_value(&messages)?);
    if !request.tools.is_empty() {
        body.insert("tools".to_string(), to_value(&request.tools)?);
        body.insert(
            "tool_choice".to_string(),
            Value::String(convert_tool_choice(request.tool_call_mode).to_string()),
        );
    }
    if let Some(temperature) = request.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    match reasoning {
        Some(OpenAiReasoning::Effort(effort)) => {
            body.insert(
                "reasoning_effort".to_string(),
                Value::String(effort.as_str().to_string()),
            );
        }
        Some(OpenAiReasoning::Nested(effort)) => {
            body.insert("reasoning".to_string(), json!({ "effort": effort.as_str() }));
        }
        None => {}
    }
    if let Some(routing) = routing.filter(|routing| !routing.is_empty()) {
        body.insert("provider".to_string(), to_value(routing)?);
    }
    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
        body.insert(
            "stream_options".to_string(),
            json!({ "include_usage": true }),
        );
    }
    Ok(Value::Object(body))
}

fn convert_tool_choice(mode: ToolCallMode) -> &'static str {
    match mode {
        ToolCallMode::Any => "required",
        ToolCallMode::Auto => "auto",
    }
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, LLMError> {
    serde_json::to_value(value)
        .map_err(|err| LLMError::validation(format!("failed to serialize request: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReasoningEffort;
    use crate::transform::{SystemRole, TransformTarget, transform_messages};
    use crate::types::{FunctionDefinition, FunctionParameters, InputMessage};

    fn request(target: TransformTarget) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4.1".to_string(),
            messages: transform_messages(
                &[InputMessage::user("hi")],
                target,
                Some("Be brief."),
                SystemRole::Developer,
            )
            .expect("transform"),
            tools: Vec::new(),
            tool_call_mode: ToolCallMode::Auto,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn minimal_body_has_model_and_messages_only() {
        let body = build_openai_body(&request(TransformTarget::OpenAi), None, None, false)
            .expect("body");
        assert_eq!(
            body,
            json!({
                "model": "gpt-4.1",
                "messages": [
                    {"role": "developer", "content": "Be brief."},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }

    #[test]
    fn tools_temperature_and_reasoning_effort_are_forwarded() {
        let mut request = request(TransformTarget::OpenAi);
        request.tools = vec![FunctionDefinition::new(
            "lookup",
            "Look something up",
            FunctionParameters::object(Map::new(), Vec::new()),
        )];
        request.tool_call_mode = ToolCallMode::Any;
        request.temperature = Some(0.5);

        let body = build_openai_body(
            &request,
            Some(OpenAiReasoning::Effort(ReasoningEffort::High)),
            None,
            false,
        )
        .expect("body");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "lookup");
        assert_eq!(body["tool_choice"], "required");
        assert_eq!(body["temperature"], json!(0.5));
        assert_eq!(body["reasoning_effort"], "high");
        assert!(body.get("reasoning").is_none());
    }

    #[test]
    fn openrouter_reasoning_and_routing_are_nested() {
        let routing = OpenRouterRouting {
            order: Some(vec!["anthropic".to_string()]),
            only: None,
            ignore: Some(vec!["deepinfra".to_string()]),
        };
        let body = build_openai_body(
            &request(TransformTarget::OpenAi),
            Some(OpenAiReasoning::Nested(ReasoningEffort::Low)),
            Some(&routing),
            false,
        )
        .expect("body");
        assert_eq!(body["reasoning"], json!({"effort": "low"}));
        assert_eq!(
            body["provider"],
            json!({"order": ["anthropic"], "ignore": ["deepinfra"]})
        );
        assert!(body.get("reasoning_effort").is_none());
    }

    #[test]
    fn streaming_requests_usage_in_final_chunk() {
        let body = build_openai_body(&request(TransformTarget::OpenAi), None, None, true)
            .expect("body");
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"], json!({"include_usage": true}));
    }

    #[test]
    fn mismatched_messages_are_an_internal_error() {
        let err = build_openai_body(&request(TransformTarget::Google), None, None, false)
            .unwrap_err();
        assert!(matches!(err, LLMError::Internal { .. }));
        assert_eq!(
            err.to_string(),
            "Messages were not properly transformed for OpenAI"
        );
    }
}
