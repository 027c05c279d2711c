use futures_util::StreamExt;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ProviderReply;
use crate::reasoning::extract_reasoning_from_tags;
use crate::stream::{SseDecoder, SseFrame};
use crate::usage;

use super::provider::PROVIDER_NAME;
use super::types::{AnthropicStreamEvent, AnthropicUsage};

/// Drives a Messages SSE body until `message_stop`.
///
/// Input tokens arrive on `message_start` and the output count on `message_delta`; both
/// reports are merged before reconciliation.
pub(crate) async fn consume_stream(
    body: HttpBodyStream,
    on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
) -> Result<ProviderReply, LLMError> {
    let mut decoder = SseDecoder::new(body, PROVIDER_NAME);
    let mut content = String::new();
    let mut usage: Option<AnthropicUsage> = None;

    while let Some(frame) = decoder.next().await {
        let data = match frame? {
            SseFrame::Done => break,
            SseFrame::Data { data, .. } => data,
        };
        let event: AnthropicStreamEvent = serde_json::from_str(&data).map_err(|err| {
            LLMError::provider(PROVIDER_NAME, format!("failed to parse stream event: {err}"))
        })?;
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                merge_usage(&mut usage, message.usage);
            }
            AnthropicStreamEvent::ContentBlockDelta { delta } => {
                if delta.kind == "text_delta" {
                    if let Some(text) = delta.text.filter(|text| !text.is_empty()) {
                        on_content(&text);
                        content.push_str(&text);
                    }
                }
            }
            AnthropicStreamEvent::MessageDelta { usage: later } => {
                merge_usage(&mut usage, later);
            }
            AnthropicStreamEvent::MessageStop => break,
            AnthropicStreamEvent::Error { error } => {
                let message = error
                    .get("message")
                    .and_then(|message| message.as_str())
                    .map_or_else(|| error.to_string(), str::to_string);
                return Err(LLMError::provider(PROVIDER_NAME, message));
            }
            AnthropicStreamEvent::Other => {}
        }
    }

    Ok(ProviderReply {
        reasoning: extract_reasoning_from_tags(&content).reasoning,
        content,
        tool_calls: Vec::new(),
        usage: usage.as_ref().map(usage::from_anthropic),
    })
}

fn merge_usage(current: &mut Option<AnthropicUsage>, later: Option<AnthropicUsage>) {
    if let Some(later) = later {
        current.get_or_insert_with(AnthropicUsage::default).merge(later);
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn body(events: &[(&str, &str)]) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, LLMError>> = events
            .iter()
            .map(|(event, data)| Ok(format!("event: {event}\ndata: {data}\n\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn text_deltas_and_merged_usage() {
        let body = body(&[
            (
                "message_start",
                r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":25,"output_tokens":1,"cache_read_input_tokens":5}}}"#,
            ),
            (
                "content_block_start",
                r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            ),
            ("ping", r#"{"type":"ping"}"#),
            (
                "content_block_delta",
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
            ),
            (
                "content_block_delta",
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" there"}}"#,
            ),
            (
                "message_delta",
                r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":9}}"#,
            ),
            ("message_stop", r#"{"type":"message_stop"}"#),
        ]);
        let mut streamed = Vec::new();
        let mut callback = |text: &str| streamed.push(text.to_string());
        let reply = consume_stream(body, &mut callback).await.expect("reply");
        assert_eq!(streamed, vec!["Hi", " there"]);
        assert_eq!(reply.content, "Hi there");
        let usage = reply.usage.expect("usage");
        assert_eq!(usage.prompt_tokens, 25);
        assert_eq!(usage.completion_tokens, 9);
        assert_eq!(usage.total_tokens, 39);
    }

    #[tokio::test]
    async fn error_event_is_reported() {
        let body = body(&[(
            "error",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )]);
        let mut callback = |_: &str| {};
        match consume_stream(body, &mut callback).await {
            Err(LLMError::Provider { provider, message }) => {
                assert_eq!(provider, "anthropic_messages");
                assert_eq!(message, "Overloaded");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
