//! Gemini `generateContent` schema, served by both AI Studio and Vertex AI.

pub(crate) mod error;
pub(crate) mod provider;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod stream;
pub mod types;

pub use provider::{GeminiAuth, GoogleGeminiProvider};
