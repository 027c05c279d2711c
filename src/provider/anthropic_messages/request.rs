use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::models::output_token_limit;
use crate::provider::ProviderRequest;
use crate::types::{FunctionDefinition, ToolCallMode};

/// `max_tokens` used when the model table has no entry, and whenever tools are sent.
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Resolves `max_tokens`: table limit, then the caller's override, then the tool floor.
pub(crate) fn resolve_max_tokens(model: &str, requested: Option<u32>, has_tools: bool) -> u32 {
    if has_tools {
        return DEFAULT_MAX_TOKENS;
    }
    requested
        .or_else(|| output_token_limit(model))
        .unwrap_or(DEFAULT_MAX_TOKENS)
}

pub(crate) fn build_anthropic_body(
    request: &ProviderRequest,
    stream: bool,
) -> Result<Value, LLMError> {
    let (system, messages) = request.messages.clone().into_anthropic()?;

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert(
        "max_tokens".to_string(),
        Value::from(resolve_max_tokens(
            &request.model,
            request.max_tokens,
            !request.tools.is_empty(),
        )),
    );
    body.insert(
        "messages".to_string(),
        serde_json::to_value(&messages).map_err(|err| {
            LLMError::validation(format!("failed to serialize request: {err}"))
        })?,
    );
    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system));
    }
    if let Some(temperature) = request.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if !request.tools.is_empty() {
        body.insert("tools".to_string(), convert_tools(&request.tools));
        body.insert(
            "tool_choice".to_string(),
            convert_tool_choice(request.tool_call_mode),
        );
    }
    if stream {
        body.insert("stream".to_string(), Value::Bool(true));
    }
    Ok(Value::Object(body))
}

fn convert_tools(tools: &[FunctionDefinition]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.function.name,
                    "description": tool.function.description,
                    "input_schema": tool.function.parameters
                })
            })
            .collect(),
    )
}

fn convert_tool_choice(mode: ToolCallMode) -> Value {
    match mode {
        ToolCallMode::Any => json!({ "type": "any" }),
        ToolCallMode::Auto => json!({ "type": "auto" }),
    }
}
