//! OpenAI Chat Completions schema.
//!
//! Shared by every OpenAI-compatible provider: the first-party API, relays such as
//! OpenRouter, Azure deployments and caller-supplied base URLs.

pub(crate) mod error;
pub(crate) mod provider;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod stream;
pub mod types;

pub use provider::{OpenAiAuth, OpenAiChatProvider, OpenAiReasoning};
