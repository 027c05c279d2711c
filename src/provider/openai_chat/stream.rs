use futures_util::StreamExt;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ProviderReply;
use crate::reasoning::extract_reasoning_from_tags;
use crate::stream::{SseDecoder, SseFrame};
use crate::usage::{self, UsageOptions};

use super::provider::PROVIDER_NAME;
use super::types::{OpenAiStreamChunk, OpenAiUsage};

/// Drives a Chat Completions SSE body to completion.
///
/// Text deltas reach `on_content` before the next chunk is read. Usage comes from the
/// last chunk that carries it, which is the trailing chunk when `include_usage` is set.
pub(crate) async fn consume_stream(
    body: HttpBodyStream,
    on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
    usage_options: UsageOptions,
) -> Result<ProviderReply, LLMError> {
    let mut decoder = SseDecoder::new(body, PROVIDER_NAME);
    let mut content = String::new();
    let mut reasoning = String::new();
    let mut last_usage: Option<OpenAiUsage> = None;

    while let Some(frame) = decoder.next().await {
        let data = match frame? {
            SseFrame::Done => break,
            SseFrame::Data { data, .. } => data,
        };
        let chunk: OpenAiStreamChunk = serde_json::from_str(&data).map_err(|err| {
            LLMError::provider(PROVIDER_NAME, format!("failed to parse stream chunk: {err}"))
        })?;
        if let Some(error) = chunk.error {
            return Err(LLMError::provider(
                PROVIDER_NAME,
                format!("stream error: {error}"),
            ));
        }
        if chunk.usage.is_some() {
            last_usage = chunk.usage;
        }
        for delta in chunk.choices.into_iter().filter_map(|choice| choice.delta) {
            if let Some(text) = delta.content.filter(|text| !text.is_empty()) {
                on_content(&text);
                content.push_str(&text);
            }
            if let Some(thought) = delta.reasoning_content.or(delta.reasoning) {
                reasoning.push_str(&thought);
            }
        }
    }

    // 流式文本原样保留，标签内的推理只做提取
    let reasoning = if reasoning.is_empty() {
        extract_reasoning_from_tags(&content).reasoning
    } else {
        Some(reasoning)
    };

    Ok(ProviderReply {
        content,
        reasoning,
        tool_calls: Vec::new(),
        usage: last_usage.map(|raw| usage::from_openai(&raw, usage_options)),
    })
}
