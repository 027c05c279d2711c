use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::retry::retry_after_from_headers;
use crate::provider::{LLMProvider, ProviderReply, ProviderRequest};
use crate::stream::collect_stream_text;

use super::error::parse_anthropic_error;
use super::request::build_anthropic_body;
use super::response::map_response;
use super::stream::consume_stream;
use super::types::AnthropicMessageResponse;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";
const TOKEN_EFFICIENT_TOOLS_BETA: &str = "token-efficient-tools-2025-02-19";
/// 需要 token-efficient-tools beta 的模型
const TOKEN_EFFICIENT_TOOLS_MODEL: &str = "claude-3-7-sonnet-20250219";
pub(crate) const PROVIDER_NAME: &str = "anthropic_messages";

/// Anthropic Messages Provider（兼容 Claude 3.x Messages API）
pub struct AnthropicMessagesProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) headers: HashMap<String, String>,
}

impl AnthropicMessagesProvider {
    /// 使用默认 base_url 与 anthropic-version 创建 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            headers: HashMap::new(),
        }
    }

    /// 自定义 base_url，便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 附加请求头，覆盖同名默认头
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self, model: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), self.api_key.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("anthropic-version".to_string(), DEFAULT_VERSION.to_string());
        if model == TOKEN_EFFICIENT_TOOLS_MODEL {
            headers.insert(
                "anthropic-beta".to_string(),
                TOKEN_EFFICIENT_TOOLS_BETA.to_string(),
            );
        }
        for (name, value) in &self.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, LLMError> {
        let status = response.status;
        let success = response.is_success();
        let retry_after = retry_after_from_headers(&response.headers);
        let text = response.into_string()?;
        if success {
            Ok(text)
        } else {
            tracing::warn!(provider = PROVIDER_NAME, status, body = %text, "vendor returned an error");
            Err(parse_anthropic_error(status, &text, retry_after))
        }
    }

    fn try_parse<T: DeserializeOwned>(&self, text: &str) -> Result<T, LLMError> {
        serde_json::from_str(text).map_err(|err| {
            LLMError::provider(
                PROVIDER_NAME,
                format!("failed to parse Anthropic response: {err}"),
            )
        })
    }

    fn build_request_body(&self, request: &ProviderRequest, stream: bool) -> Result<Value, LLMError> {
        build_anthropic_body(request, stream)
    }
}

#[async_trait]
impl LLMProvider for AnthropicMessagesProvider {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderReply, LLMError> {
        let body = self.build_request_body(&request, false)?;
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(&request.model),
            &body,
        )
        .await?;
        let text = self.ensure_success(response)?;
        let parsed: AnthropicMessageResponse = self.try_parse(&text)?;
        Ok(map_response(parsed))
    }

    async fn stream_chat(
        &self,
        request: ProviderRequest,
        on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<ProviderReply, LLMError> {
        let body = self.build_request_body(&request, true)?;
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(&request.model),
            &body,
        )
        .await?;
        if !response.is_success() {
            let retry_after = retry_after_from_headers(&response.headers);
            let text = collect_stream_text(response.body, PROVIDER_NAME).await?;
            tracing::warn!(provider = PROVIDER_NAME, status = response.status, body = %text, "vendor returned an error");
            return Err(parse_anthropic_error(response.status, &text, retry_after));
        }
        consume_stream(response.body, on_content).await
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    fn provider() -> AnthropicMessagesProvider {
        AnthropicMessagesProvider::new(default_dyn_transport().expect("transport"), "sk-ant")
    }

    #[test]
    fn endpoint_handles_versioned_and_bare_base_urls() {
        assert_eq!(provider().endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(
            provider().with_base_url("https://proxy.local/v1/").endpoint(),
            "https://proxy.local/v1/messages"
        );
    }

    #[test]
    fn beta_header_only_for_token_efficient_model() {
        let headers = provider().build_headers("claude-3-7-sonnet-20250219");
        assert_eq!(
            headers.get("anthropic-beta").map(String::as_str),
            Some("token-efficient-tools-2025-02-19")
        );
        assert_eq!(headers.get("x-api-key").map(String::as_str), Some("sk-ant"));
        assert_eq!(
            headers.get("anthropic-version").map(String::as_str),
            Some("2023-06-01")
        );

        let headers = provider().build_headers("claude-sonnet-4-20250514");
        assert!(!headers.contains_key("anthropic-beta"));
    }
}
