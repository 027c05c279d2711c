use serde_json::Value;

use crate::provider::ProviderReply;
use crate::reasoning::extract_reasoning;
use crate::types::FunctionCall;
use crate::usage;

use super::types::{AnthropicMessageResponse, AnthropicResponseBlock};

/// 合并 text block，tool_use block 转为函数调用
pub(crate) fn map_response(resp: AnthropicMessageResponse) -> ProviderReply {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in resp.content {
        match block.kind.as_str() {
            "text" => text.push_str(block.text.as_deref().unwrap_or_default()),
            "tool_use" => tool_calls.push(convert_tool_use(block)),
            _ => {}
        }
    }
    let extracted = extract_reasoning(None, &text);

    ProviderReply {
        content: extracted.content,
        reasoning: extracted.reasoning,
        tool_calls,
        usage: resp.usage.as_ref().map(usage::from_anthropic),
    }
}

fn convert_tool_use(block: AnthropicResponseBlock) -> FunctionCall {
    let arguments = block.input.unwrap_or(Value::Object(Default::default()));
    FunctionCall::new(
        block.id.unwrap_or_default(),
        block.name.unwrap_or_default(),
        arguments.to_string(),
    )
}
