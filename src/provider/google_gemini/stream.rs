use futures_util::StreamExt;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ProviderReply;
use crate::reasoning::extract_reasoning_from_tags;
use crate::stream::{SseDecoder, SseFrame};
use crate::usage;

use super::provider::PROVIDER_NAME;
use super::types::{GeminiGenerateContentResponse, GeminiUsageMetadata};

/// 消费 `streamGenerateContent?alt=sse` 的响应体
///
/// 每个 chunk 都是完整的 GenerateContentResponse，usageMetadata 以最后一次出现为准
pub(crate) async fn consume_stream(
    body: HttpBodyStream,
    on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
) -> Result<ProviderReply, LLMError> {
    let mut decoder = SseDecoder::new(body, PROVIDER_NAME);
    let mut content = String::new();
    let mut usage_metadata: Option<GeminiUsageMetadata> = None;

    while let Some(frame) = decoder.next().await {
        let data = match frame? {
            SseFrame::Done => break,
            SseFrame::Data { data, .. } => data,
        };
        let chunk: GeminiGenerateContentResponse = serde_json::from_str(&data).map_err(|err| {
            LLMError::provider(PROVIDER_NAME, format!("failed to parse stream chunk: {err}"))
        })?;
        if let Some(error) = chunk.error {
            return Err(LLMError::provider(
                PROVIDER_NAME,
                format!("stream error: {error}"),
            ));
        }
        let text = chunk.text();
        if !text.is_empty() {
            on_content(&text);
            content.push_str(&text);
        }
        if chunk.usage_metadata.is_some() {
            usage_metadata = chunk.usage_metadata;
        }
    }

    Ok(ProviderReply {
        reasoning: extract_reasoning_from_tags(&content).reasoning,
        content,
        tool_calls: Vec::new(),
        usage: usage_metadata.as_ref().map(usage::from_google),
    })
}
