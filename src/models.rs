//! Known model identifiers and their metadata.
//!
//! The table is consulted for per-model output token limits (Anthropic `max_tokens`)
//! and model-specific request flags. Custom model strings have no entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// Static metadata for a [`KnownModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub output_token_limit: Option<u32>,
}

macro_rules! known_models {
    ($($variant:ident => $id:literal, $limit:expr;)+) => {
        /// Model identifiers with entries in the metadata table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum KnownModel {
            $(
                #[serde(rename = $id)]
                $variant,
            )+
        }

        impl KnownModel {
            pub const ALL: &'static [KnownModel] = &[$(KnownModel::$variant),+];

            /// Identifier sent on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(KnownModel::$variant => $id,)+
                }
            }

            pub fn info(self) -> ModelInfo {
                match self {
                    $(KnownModel::$variant => ModelInfo {
                        output_token_limit: $limit,
                    },)+
                }
            }
        }
    };
}

known_models! {
    Gpt4o => "gpt-4o", Some(16_384);
    Gpt4oMini => "gpt-4o-mini", Some(16_384);
    Gpt41 => "gpt-4.1", Some(32_768);
    Gpt41Mini => "gpt-4.1-mini", Some(32_768);
    Gpt41Nano => "gpt-4.1-nano", Some(32_768);
    Gpt5 => "gpt-5", Some(128_000);
    Gpt5Mini => "gpt-5-mini", Some(128_000);
    O3 => "o3", Some(100_000);
    O3Mini => "o3-mini", Some(100_000);
    O4Mini => "o4-mini", Some(100_000);
    Claude35Haiku20241022 => "claude-3-5-haiku-20241022", Some(8_192);
    Claude35Sonnet20240620 => "claude-3-5-sonnet-20240620", Some(8_192);
    Claude35Sonnet20241022 => "claude-3-5-sonnet-20241022", Some(8_192);
    Claude37Sonnet20250219 => "claude-3-7-sonnet-20250219", Some(64_000);
    ClaudeSonnet420250514 => "claude-sonnet-4-20250514", Some(64_000);
    ClaudeOpus420250514 => "claude-opus-4-20250514", Some(32_000);
    Gemini20Flash => "gemini-2.0-flash", Some(8_192);
    Gemini25FlashPreview0417 => "gemini-2.5-flash-preview-04-17", Some(65_536);
    Gemini25Flash => "gemini-2.5-flash", Some(65_536);
    Gemini25ProExp0325 => "gemini-2.5-pro-exp-03-25", Some(65_536);
    Gemini25ProPreview0506 => "gemini-2.5-pro-preview-05-06", Some(65_536);
    Gemini25Pro => "gemini-2.5-pro", Some(65_536);
    DeepSeekChat => "deepseek-chat", Some(8_192);
    DeepSeekReasoner => "deepseek-reasoner", None;
}

impl KnownModel {
    /// Looks up a wire identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|model| model.as_str() == id)
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| LLMError::ModelNotFound {
            model: Some(s.to_string()),
            message: format!("{s} is not in the known model table"),
        })
    }
}

/// Output token limit for a wire identifier, when the table knows it.
pub fn output_token_limit(model: &str) -> Option<u32> {
    KnownModel::from_id(model).and_then(|known| known.info().output_token_limit)
}
