use serde_json::{Map, Value, json};

use crate::error::LLMError;
use crate::provider::ProviderRequest;
use crate::types::{FunctionDefinition, ToolCallMode};

pub(crate) fn build_gemini_body(request: &ProviderRequest) -> Result<Value, LLMError> {
    let (system_instruction, contents) = request.messages.clone().into_google()?;

    let mut body = Map::new();
    body.insert(
        "contents".to_string(),
        serde_json::to_value(&contents).map_err(|err| {
            LLMError::validation(format!("failed to serialize request: {err}"))
        })?,
    );
    if let Some(system) = system_instruction {
        body.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": system }] }),
        );
    }
    if !request.tools.is_empty() {
        body.insert("tools".to_string(), convert_tools(&request.tools));
        body.insert(
            "toolConfig".to_string(),
            convert_tool_config(&request.tools, request.tool_call_mode),
        );
    }
    if let Some(temperature) = request.temperature {
        body.insert(
            "generationConfig".to_string(),
            json!({ "temperature": temperature }),
        );
    }
    Ok(Value::Object(body))
}

/// Gemini 不接受 `additionalProperties`
fn convert_tools(tools: &[FunctionDefinition]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.function.name,
                "description": tool.function.description,
                "parameters": tool.function.parameters.without_additional_properties()
            })
        })
        .collect();
    json!([{ "functionDeclarations": declarations }])
}

fn convert_tool_config(tools: &[FunctionDefinition], mode: ToolCallMode) -> Value {
    match mode {
        ToolCallMode::Any => {
            let names: Vec<&str> = tools.iter().map(FunctionDefinition::name).collect();
            json!({
                "functionCallingConfig": {
                    "mode": "ANY",
                    "allowedFunctionNames": names
                }
            })
        }
        ToolCallMode::Auto => json!({ "functionCallingConfig": { "mode": "AUTO" } }),
    }
}
