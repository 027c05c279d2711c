use std::time::Instant;

use crate::config::{ProviderOptions, build_provider};
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::{ProviderId, ProviderPolicy, ProviderRequest};
use crate::transform::transform_messages;
use crate::types::{
    FunctionDefinition, PromptOptions, ResponseMessage, StandardizedResponse, StreamingCallback,
};

/// LLM 调用入口，持有共享的 HTTP 传输层
///
/// 每次 [`send_prompt`](Self::send_prompt) 都是独立的一次调用：校验、转换消息、构建
/// Provider、发出一次请求并归一化结果，调用之间不共享可变状态。
#[derive(Clone)]
pub struct LLMClient {
    transport: DynHttpTransport,
}

impl LLMClient {
    pub fn new(transport: DynHttpTransport) -> Self {
        Self { transport }
    }

    /// 发送一次请求并返回统一结构的响应
    ///
    /// 流式模式下每个文本增量按到达顺序交给 `on_streaming_content`，全部增量拼接后
    /// 与返回的 `message.content` 完全一致。
    ///
    /// # Errors
    ///
    /// 流式校验失败、消息无法转换、配置不完整或供应商调用失败时返回 [`LLMError`]。
    pub async fn send_prompt(
        &self,
        prompt: PromptOptions,
        provider_options: &ProviderOptions,
    ) -> Result<StandardizedResponse, LLMError> {
        let started = Instant::now();
        let id = provider_options.id();
        let policy = id.policy();
        let model = provider_options.model().as_str().to_string();

        let PromptOptions {
            messages,
            system_prompt,
            tools,
            tool_call_mode,
            temperature,
            anthropic_max_tokens,
            stream,
            on_streaming_content,
        } = prompt;

        let mut on_content = if stream {
            Some(check_streaming(id, &policy, &tools, on_streaming_content)?)
        } else {
            None
        };

        tracing::debug!(
            provider = %id,
            model = %model,
            stream,
            tools = tools.len(),
            "dispatching prompt"
        );

        let transformed = transform_messages(
            &messages,
            policy.target,
            system_prompt.as_deref(),
            policy.system_role,
        )?;
        let backend = build_provider(provider_options, self.transport.clone())?;
        let request = ProviderRequest {
            model,
            messages: transformed,
            tools,
            tool_call_mode,
            temperature,
            max_tokens: anthropic_max_tokens,
        };

        let reply = match on_content.as_mut() {
            Some(callback) => backend.stream_chat(request, callback.as_mut()).await?,
            None => backend.chat(request).await?,
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(
            provider = %id,
            duration_ms,
            prompt_tokens = reply.usage.map(|usage| usage.prompt_tokens),
            completion_tokens = reply.usage.map(|usage| usage.completion_tokens),
            "prompt completed"
        );

        Ok(StandardizedResponse {
            message: ResponseMessage::assistant(reply.content),
            tool_calls: (!reply.tool_calls.is_empty()).then_some(reply.tool_calls),
            usage: reply.usage,
            reasoning: reply.reasoning,
            duration_ms,
        })
    }
}

/// 流式请求的前置校验，顺序固定：供应商能力、工具、回调
fn check_streaming(
    id: ProviderId,
    policy: &ProviderPolicy,
    tools: &[FunctionDefinition],
    callback: Option<StreamingCallback>,
) -> Result<StreamingCallback, LLMError> {
    if !policy.supports_streaming {
        return Err(LLMError::validation(format!(
            "Streaming is not supported for provider {id}"
        )));
    }
    if !tools.is_empty() {
        return Err(LLMError::validation(
            "Streaming is not supported when using tool calls",
        ));
    }
    callback.ok_or_else(|| {
        LLMError::validation("a streaming content callback is required when streaming is enabled")
    })
}
