//! Provider options and provider construction.
//!
//! [`ProviderOptions`] is the sum type callers hand to `send_prompt`. It deserializes
//! from the camelCase JSON form tagged by `provider`, and [`build_provider`] turns one
//! into a ready [`LLMProvider`](crate::provider::LLMProvider) backed by the shared
//! transport.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::models::KnownModel;
use crate::provider::anthropic_messages::AnthropicMessagesProvider;
use crate::provider::google_gemini::GoogleGeminiProvider;
use crate::provider::openai_chat::{OpenAiAuth, OpenAiChatProvider, OpenAiReasoning};
use crate::provider::{DynProvider, ProviderId};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const FIREWORKS_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";
const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const XAI_BASE_URL: &str = "https://api.x.ai/v1";

pub const GOOGLE_CLOUD_PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
pub const GOOGLE_CLOUD_LOCATION_ENV: &str = "GOOGLE_CLOUD_LOCATION";
pub const GOOGLE_CLOUD_ACCESS_TOKEN_ENV: &str = "GOOGLE_CLOUD_ACCESS_TOKEN";

/// 供应商配置，按 `provider` 标签区分
///
/// # Examples
///
/// ```
/// use kotoba_bridge::config::{ModelSelection, parse_provider_options};
/// use kotoba_bridge::models::KnownModel;
/// use kotoba_bridge::provider::ProviderId;
/// use serde_json::json;
///
/// let options = parse_provider_options(json!({
///     "provider": "openai",
///     "apiKey": "sk-test",
///     "model": "gpt-4.1"
/// }))
/// .unwrap();
/// assert_eq!(options.id(), ProviderId::OpenAi);
/// assert_eq!(options.model(), &ModelSelection::Known(KnownModel::Gpt41));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum ProviderOptions {
    #[serde(rename = "openai")]
    OpenAi(OpenAiOptions),
    #[serde(rename = "anthropic")]
    Anthropic(ApiKeyOptions),
    #[serde(rename = "google")]
    Google(ApiKeyOptions),
    #[serde(rename = "google_vertex_ai")]
    GoogleVertexAi(VertexAiOptions),
    #[serde(rename = "openrouter")]
    OpenRouter(OpenRouterOptions),
    #[serde(rename = "fireworks")]
    Fireworks(ApiKeyOptions),
    #[serde(rename = "deepseek")]
    DeepSeek(ApiKeyOptions),
    #[serde(rename = "xai")]
    Xai(ApiKeyOptions),
    #[serde(rename = "azure_openai")]
    AzureOpenAi(AzureOpenAiOptions),
    #[serde(rename = "custom")]
    Custom(CustomOptions),
}

impl ProviderOptions {
    pub fn id(&self) -> ProviderId {
        match self {
            Self::OpenAi(_) => ProviderId::OpenAi,
            Self::Anthropic(_) => ProviderId::Anthropic,
            Self::Google(_) => ProviderId::Google,
            Self::GoogleVertexAi(_) => ProviderId::GoogleVertexAi,
            Self::OpenRouter(_) => ProviderId::OpenRouter,
            Self::Fireworks(_) => ProviderId::Fireworks,
            Self::DeepSeek(_) => ProviderId::DeepSeek,
            Self::Xai(_) => ProviderId::Xai,
            Self::AzureOpenAi(_) => ProviderId::AzureOpenAi,
            Self::Custom(_) => ProviderId::Custom,
        }
    }

    pub fn model(&self) -> &ModelSelection {
        match self {
            Self::OpenAi(options) => &options.model,
            Self::Anthropic(options)
            | Self::Google(options)
            | Self::Fireworks(options)
            | Self::DeepSeek(options)
            | Self::Xai(options) => &options.model,
            Self::GoogleVertexAi(options) => &options.model,
            Self::OpenRouter(options) => &options.model,
            Self::AzureOpenAi(options) => &options.model,
            Self::Custom(options) => &options.model,
        }
    }

    /// 额外请求头
    pub fn headers(&self) -> &HashMap<String, String> {
        match self {
            Self::OpenAi(options) => &options.headers,
            Self::Anthropic(options)
            | Self::Google(options)
            | Self::Fireworks(options)
            | Self::DeepSeek(options)
            | Self::Xai(options) => &options.headers,
            Self::GoogleVertexAi(options) => &options.headers,
            Self::OpenRouter(options) => &options.headers,
            Self::AzureOpenAi(options) => &options.headers,
            Self::Custom(options) => &options.headers,
        }
    }
}

/// 模型选择：表内模型或任意字符串，二者只能出现一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelSelection {
    #[serde(rename = "model")]
    Known(KnownModel),
    #[serde(rename = "customModel")]
    Custom(String),
}

impl ModelSelection {
    /// 线上发送的模型 ID
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(model) => model.as_str(),
            Self::Custom(model) => model,
        }
    }
}

/// 推理强度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// OpenRouter upstream routing preferences, sent as the request's `provider` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRouterRouting {
    /// Upstream providers to try, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    /// Allow-list of upstream providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<Vec<String>>,
    /// Upstream providers to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
}

impl OpenRouterRouting {
    pub fn is_empty(&self) -> bool {
        self.order.is_none() && self.only.is_none() && self.ignore.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiOptions {
    pub api_key: String,
    #[serde(flatten)]
    pub model: ModelSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// 只需要 API Key 的供应商：anthropic、google 以及固定 base_url 的兼容后端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyOptions {
    pub api_key: String,
    #[serde(flatten)]
    pub model: ModelSelection,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Vertex AI；凭证取自运行环境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexAiOptions {
    /// Falls back to `GOOGLE_CLOUD_PROJECT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Falls back to `GOOGLE_CLOUD_LOCATION`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub model: ModelSelection,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRouterOptions {
    pub api_key: String,
    #[serde(flatten)]
    pub model: ModelSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_options: Option<OpenRouterRouting>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOpenAiOptions {
    /// Resource URL, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub api_key: String,
    #[serde(flatten)]
    pub model: ModelSelection,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl AzureOpenAiOptions {
    /// Full chat completions URL of the deployment.
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOptions {
    #[serde(alias = "baseURL")]
    pub base_url: String,
    pub api_key: String,
    #[serde(flatten)]
    pub model: ModelSelection,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// 解析 JSON 形式的供应商配置
///
/// 先检查 `provider` 标签，未知标签返回 [`LLMError::UnsupportedProvider`]；
/// 缺少 `model` 与 `customModel` 时返回 [`LLMError::InvalidConfig`]。
pub fn parse_provider_options(value: Value) -> Result<ProviderOptions, LLMError> {
    let object = value.as_object().ok_or_else(|| LLMError::InvalidConfig {
        field: "providerOptions".to_string(),
        reason: "expected a JSON object".to_string(),
    })?;
    let tag = object
        .get("provider")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LLMError::InvalidConfig {
            field: "provider".to_string(),
            reason: "missing provider identifier".to_string(),
        })?;
    tag.parse::<ProviderId>()?;

    match (object.contains_key("model"), object.contains_key("customModel")) {
        (false, false) => {
            return Err(LLMError::InvalidConfig {
                field: "model".to_string(),
                reason: "either model or customModel is required".to_string(),
            });
        }
        (true, true) => {
            return Err(LLMError::InvalidConfig {
                field: "model".to_string(),
                reason: "model and customModel are mutually exclusive".to_string(),
            });
        }
        _ => {}
    }

    serde_json::from_value(value).map_err(|err| LLMError::InvalidConfig {
        field: tag_field(&tag),
        reason: err.to_string(),
    })
}

fn tag_field(tag: &str) -> String {
    format!("providerOptions[{tag}]")
}

/// 根据配置构建 Provider，Vertex AI 的凭证从进程环境变量读取
pub fn build_provider(
    options: &ProviderOptions,
    transport: DynHttpTransport,
) -> Result<DynProvider, LLMError> {
    build_provider_with_env(options, transport, |name| std::env::var(name).ok())
}

pub(crate) fn build_provider_with_env<E>(
    options: &ProviderOptions,
    transport: DynHttpTransport,
    env: E,
) -> Result<DynProvider, LLMError>
where
    E: Fn(&str) -> Option<String>,
{
    let usage_options = options.id().policy().usage;
    let headers = options.headers().clone();

    let provider: DynProvider = match options {
        ProviderOptions::OpenAi(config) => {
            let mut provider = OpenAiChatProvider::new(transport, config.api_key.clone())
                .with_usage_options(usage_options)
                .with_headers(headers);
            if let Some(effort) = config.reasoning_effort {
                provider = provider.with_reasoning(OpenAiReasoning::Effort(effort));
            }
            Arc::new(provider)
        }
        ProviderOptions::OpenRouter(config) => {
            let mut provider = OpenAiChatProvider::new(transport, config.api_key.clone())
                .with_base_url(OPENROUTER_BASE_URL)
                .with_usage_options(usage_options)
                .with_headers(headers);
            if let Some(effort) = config.reasoning_effort {
                provider = provider.with_reasoning(OpenAiReasoning::Nested(effort));
            }
            if let Some(routing) = &config.provider_options {
                provider = provider.with_routing(routing.clone());
            }
            Arc::new(provider)
        }
        ProviderOptions::Fireworks(config)
        | ProviderOptions::DeepSeek(config)
        | ProviderOptions::Xai(config) => {
            let base_url = match options.id() {
                ProviderId::Fireworks => FIREWORKS_BASE_URL,
                ProviderId::DeepSeek => DEEPSEEK_BASE_URL,
                _ => XAI_BASE_URL,
            };
            Arc::new(
                OpenAiChatProvider::new(transport, config.api_key.clone())
                    .with_base_url(base_url)
                    .with_usage_options(usage_options)
                    .with_headers(headers),
            )
        }
        ProviderOptions::AzureOpenAi(config) => {
            require_non_empty("endpoint", &config.endpoint)?;
            require_non_empty("deployment", &config.deployment)?;
            require_non_empty("apiVersion", &config.api_version)?;
            Arc::new(
                OpenAiChatProvider::new(transport, config.api_key.clone())
                    .with_endpoint(config.chat_completions_url())
                    .with_auth(OpenAiAuth::ApiKeyHeader)
                    .with_usage_options(usage_options)
                    .with_headers(headers),
            )
        }
        ProviderOptions::Custom(config) => {
            require_non_empty("baseUrl", &config.base_url)?;
            Arc::new(
                OpenAiChatProvider::new(transport, config.api_key.clone())
                    .with_base_url(&config.base_url)
                    .with_usage_options(usage_options)
                    .with_headers(headers),
            )
        }
        ProviderOptions::Anthropic(config) => Arc::new(
            AnthropicMessagesProvider::new(transport, config.api_key.clone()).with_headers(headers),
        ),
        ProviderOptions::Google(config) => Arc::new(
            GoogleGeminiProvider::new(transport, config.api_key.clone()).with_headers(headers),
        ),
        ProviderOptions::GoogleVertexAi(config) => {
            let project = config
                .project
                .clone()
                .or_else(|| env(GOOGLE_CLOUD_PROJECT_ENV))
                .ok_or_else(|| missing_setting("project", GOOGLE_CLOUD_PROJECT_ENV))?;
            let location = config
                .location
                .clone()
                .or_else(|| env(GOOGLE_CLOUD_LOCATION_ENV))
                .ok_or_else(|| missing_setting("location", GOOGLE_CLOUD_LOCATION_ENV))?;
            let token = env(GOOGLE_CLOUD_ACCESS_TOKEN_ENV)
                .filter(|token| !token.trim().is_empty())
                .ok_or_else(|| LLMError::Auth {
                    message: format!(
                        "Vertex AI requires an access token in {GOOGLE_CLOUD_ACCESS_TOKEN_ENV}"
                    ),
                })?;
            Arc::new(
                GoogleGeminiProvider::vertex(transport, &project, &location, token.trim())
                    .with_headers(headers),
            )
        }
    };

    Ok(provider)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), LLMError> {
    if value.trim().is_empty() {
        return Err(LLMError::InvalidConfig {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn missing_setting(field: &str, env_name: &str) -> LLMError {
    LLMError::InvalidConfig {
        field: field.to_string(),
        reason: format!("not set in options or {env_name}"),
    }
}
