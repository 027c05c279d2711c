use crate::error::LLMError;
use crate::provider::ProviderReply;
use crate::reasoning::extract_reasoning;
use crate::types::FunctionCall;
use crate::usage::{self, UsageOptions};

use super::provider::PROVIDER_NAME;
use super::types::{OpenAiChatResponse, OpenAiToolCallResponse};

pub(crate) fn map_response(
    resp: OpenAiChatResponse,
    usage_options: UsageOptions,
) -> Result<ProviderReply, LLMError> {
    let usage = resp
        .usage
        .as_ref()
        .map(|raw| usage::from_openai(raw, usage_options));
    let message = resp
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| LLMError::provider(PROVIDER_NAME, "response contained no message"))?;

    let content = message
        .content
        .map(|content| content.into_text())
        .unwrap_or_default();
    let extracted = extract_reasoning(Some(&message.extra), &content);
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(convert_tool_call_response)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProviderReply {
        content: extracted.content,
        reasoning: extracted.reasoning,
        tool_calls,
        usage,
    })
}

fn convert_tool_call_response(call: OpenAiToolCallResponse) -> Result<FunctionCall, LLMError> {
    if let Some(kind) = call.kind.as_deref().filter(|kind| *kind != "function") {
        return Err(LLMError::provider(
            PROVIDER_NAME,
            format!("unsupported tool type {kind}"),
        ));
    }
    let function = call.function.ok_or_else(|| {
        LLMError::provider(PROVIDER_NAME, "tool call is missing its function body")
    })?;
    Ok(FunctionCall::new(
        call.id.unwrap_or_default(),
        function.name.unwrap_or_default(),
        function.arguments.unwrap_or_default(),
    ))
}
