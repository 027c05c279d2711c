use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{OpenRouterRouting, ReasoningEffort};
use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::retry::retry_after_from_headers;
use crate::provider::{LLMProvider, ProviderReply, ProviderRequest};
use crate::stream::collect_stream_text;
use crate::usage::UsageOptions;

use super::error::parse_openai_error;
use super::request::build_openai_body;
use super::response::map_response;
use super::stream::consume_stream;
use super::types::OpenAiChatResponse;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const PROVIDER_NAME: &str = "openai_chat";

/// 鉴权头的形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiAuth {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>`，Azure 使用
    ApiKeyHeader,
}

/// 推理强度在请求体中的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiReasoning {
    /// 顶层 `reasoning_effort`
    Effort(ReasoningEffort),
    /// OpenRouter 的 `reasoning: {effort}`
    Nested(ReasoningEffort),
}

/// OpenAI Chat Completions Provider
pub struct OpenAiChatProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) endpoint: String,
    pub(crate) api_key: String,
    pub(crate) auth: OpenAiAuth,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) usage_options: UsageOptions,
    pub(crate) reasoning: Option<OpenAiReasoning>,
    pub(crate) routing: Option<OpenRouterRouting>,
}

impl OpenAiChatProvider {
    /// 创建带默认 base_url 的 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: chat_completions_url(DEFAULT_BASE_URL),
            api_key: api_key.into(),
            auth: OpenAiAuth::Bearer,
            headers: HashMap::new(),
            usage_options: UsageOptions::default(),
            reasoning: None,
            routing: None,
        }
    }

    /// 自定义 base_url，请求发往 `<base_url>/chat/completions`
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.endpoint = chat_completions_url(base_url.as_ref());
        self
    }

    /// 直接指定完整 URL，例如带 `api-version` 查询参数的 Azure 部署地址
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_auth(mut self, auth: OpenAiAuth) -> Self {
        self.auth = auth;
        self
    }

    /// 附加请求头，覆盖同名默认头
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_usage_options(mut self, options: UsageOptions) -> Self {
        self.usage_options = options;
        self
    }

    pub fn with_reasoning(mut self, reasoning: OpenAiReasoning) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    /// OpenRouter 上游路由偏好
    pub fn with_routing(mut self, routing: OpenRouterRouting) -> Self {
        self.routing = Some(routing);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        match self.auth {
            OpenAiAuth::Bearer => {
                headers.insert(
                    "Authorization".to_string(),
                    format!("Bearer {}", self.api_key),
                );
            }
            OpenAiAuth::ApiKeyHeader => {
                headers.insert("api-key".to_string(), self.api_key.clone());
            }
        }
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    fn request_headers(&self) -> HashMap<String, String> {
        let mut headers = self.build_headers();
        for (name, value) in &self.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn build_request_body(&self, request: &ProviderRequest, stream: bool) -> Result<Value, LLMError> {
        build_openai_body(
            request,
            self.reasoning,
            self.routing.as_ref(),
            stream,
        )
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
            Err(parse_openai_error(status, &text, retry_after))
        }
    }

    fn try_parse<T: DeserializeOwned>(&self, text: &str) -> Result<T, LLMError> {
        serde_json::from_str(text).map_err(|err| {
            LLMError::provider(
                PROVIDER_NAME,
                format!("failed to parse OpenAI response: {err}"),
            )
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAiChatProvider {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderReply, LLMError> {
        let body = self.build_request_body(&request, false)?;
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint.as_str(),
            self.request_headers(),
            &body,
        )
        .await?;
        let text = self.ensure_success(response)?;
        let parsed: OpenAiChatResponse = self.try_parse(&text)?;
        map_response(parsed, self.usage_options)
    }

    async fn stream_chat(
        &self,
        request: ProviderRequest,
        on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<ProviderReply, LLMError> {
        let body = self.build_request_body(&request, true)?;
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint.as_str(),
            self.request_headers(),
            &body,
        )
        .await?;
        if !response.is_success() {
            let retry_after = retry_after_from_headers(&response.headers);
            let text = collect_stream_text(response.body, PROVIDER_NAME).await?;
            tracing::warn!(provider = PROVIDER_NAME, status = response.status, body = %text, "vendor returned an error");
            return Err(parse_openai_error(response.status, &text, retry_after));
        }
        consume_stream(response.body, on_content, self.usage_options).await
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}
