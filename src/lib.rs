//! LLM 多供应商统一调用库
//!
//! 一个 [`send_prompt`] 覆盖 OpenAI、Anthropic、Google Gemini（含 Vertex AI）以及
//! OpenRouter、Fireworks、DeepSeek、xAI、Azure OpenAI 和自定义 OpenAI 兼容端点。
//! 调用方传入中立的消息与工具定义，得到统一的 [`StandardizedResponse`]。

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod image;
pub mod models;
pub mod provider;
pub mod reasoning;
pub mod stream;
pub mod transform;
pub mod types;
pub mod usage;

pub use client::LLMClient;
pub use config::{ModelSelection, ProviderOptions, parse_provider_options};
pub use error::LLMError;
pub use provider::{LLMProvider, ProviderId};
pub use types::*;

/// 使用默认 reqwest 传输层发送一次请求
///
/// # Errors
///
/// 传输层初始化失败时返回 [`LLMError::Transport`]，其余错误同
/// [`LLMClient::send_prompt`]。
pub async fn send_prompt(
    prompt: PromptOptions,
    provider_options: &ProviderOptions,
) -> Result<StandardizedResponse, LLMError> {
    let transport = http::reqwest::default_dyn_transport()?;
    LLMClient::new(transport).send_prompt(prompt, provider_options).await
}
