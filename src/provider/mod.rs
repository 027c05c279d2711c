use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::transform::{SystemRole, TransformTarget, TransformedMessages};
use crate::types::{FunctionCall, FunctionDefinition, ToolCallMode, Usage};
use crate::usage::UsageOptions;

pub mod anthropic_messages;
pub mod google_gemini;
pub mod openai_chat;
pub(crate) mod retry;

/// 调用方可选择的供应商标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Google,
    GoogleVertexAi,
    OpenRouter,
    Fireworks,
    DeepSeek,
    Xai,
    AzureOpenAi,
    Custom,
}

impl ProviderId {
    pub const ALL: [ProviderId; 10] = [
        Self::OpenAi,
        Self::Anthropic,
        Self::Google,
        Self::GoogleVertexAi,
        Self::OpenRouter,
        Self::Fireworks,
        Self::DeepSeek,
        Self::Xai,
        Self::AzureOpenAi,
        Self::Custom,
    ];

    /// `provider` 标签的取值
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::GoogleVertexAi => "google_vertex_ai",
            Self::OpenRouter => "openrouter",
            Self::Fireworks => "fireworks",
            Self::DeepSeek => "deepseek",
            Self::Xai => "xai",
            Self::AzureOpenAi => "azure_openai",
            Self::Custom => "custom",
        }
    }

    /// Per-provider behaviour table, consulted once per call.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::provider::ProviderId;
    /// use kotoba_bridge::transform::{SystemRole, TransformTarget};
    ///
    /// let openai = ProviderId::OpenAi.policy();
    /// assert_eq!(openai.target, TransformTarget::OpenAi);
    /// assert_eq!(openai.system_role, SystemRole::Developer);
    ///
    /// let vertex = ProviderId::GoogleVertexAi.policy();
    /// assert_eq!(vertex.target, TransformTarget::Google);
    /// assert!(!ProviderId::DeepSeek.policy().supports_streaming);
    /// ```
    pub fn policy(self) -> ProviderPolicy {
        let (target, system_role, supports_streaming, count_thoughts) = match self {
            Self::OpenAi => (TransformTarget::OpenAi, SystemRole::Developer, true, true),
            Self::Anthropic => (TransformTarget::Anthropic, SystemRole::System, true, true),
            Self::Google | Self::GoogleVertexAi => {
                (TransformTarget::Google, SystemRole::System, true, true)
            }
            Self::OpenRouter => (TransformTarget::OpenAi, SystemRole::System, true, false),
            Self::Fireworks | Self::Xai => (TransformTarget::OpenAi, SystemRole::System, true, true),
            Self::DeepSeek | Self::AzureOpenAi | Self::Custom => {
                (TransformTarget::OpenAi, SystemRole::System, false, true)
            }
        };
        ProviderPolicy {
            target,
            system_role,
            supports_streaming,
            usage: UsageOptions {
                count_thoughts_in_completion: count_thoughts,
            },
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| LLMError::UnsupportedProvider {
                provider: s.to_string(),
            })
    }
}

/// 供应商的调度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPolicy {
    /// 消息转换目标 schema
    pub target: TransformTarget,
    /// OpenAI schema 下 system prompt 使用的角色
    pub system_role: SystemRole,
    pub supports_streaming: bool,
    /// OpenAI schema 的 usage 映射参数，其余 schema 忽略
    pub usage: UsageOptions,
}

/// 已完成消息转换、交给具体供应商的请求
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// 线上发送的模型 ID
    pub model: String,
    pub messages: TransformedMessages,
    pub tools: Vec<FunctionDefinition>,
    pub tool_call_mode: ToolCallMode,
    pub temperature: Option<f64>,
    /// 调用方显式指定的 Anthropic `max_tokens`
    pub max_tokens: Option<u32>,
}

/// 供应商返回的统一结果，尚未附加耗时
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderReply {
    pub content: String,
    pub reasoning: Option<String>,
    pub tool_calls: Vec<FunctionCall>,
    pub usage: Option<Usage>,
}

/// 统一的 Provider Trait 所有供应商实现该接口即可接入
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 提交完整请求并等待完整响应
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderReply, LLMError>;

    /// 以流式方式请求，每个文本增量按到达顺序交给 `on_content`
    async fn stream_chat(
        &self,
        request: ProviderRequest,
        on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<ProviderReply, LLMError>;

    /// 线上 schema 名称
    fn name(&self) -> &'static str;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn LLMProvider>;
