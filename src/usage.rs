//! Per-vendor token accounting.
//!
//! Each schema counts tokens differently, so each gets its own mapping into [`Usage`].
//! The asymmetry is deliberate:
//!
//! * OpenAI-schema totals are taken from the vendor as-is.
//! * Anthropic totals are recomputed and include both cache categories.
//! * Google totals are recomputed from prompt and completion counts.

use crate::provider::anthropic_messages::types::AnthropicUsage;
use crate::provider::google_gemini::types::GeminiUsageMetadata;
use crate::provider::openai_chat::types::OpenAiUsage;
use crate::types::Usage;

/// Knobs for the OpenAI-schema mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageOptions {
    /// Add reported reasoning tokens on top of `completion_tokens`.
    ///
    /// Must be `false` for relays whose completion count already includes them.
    pub count_thoughts_in_completion: bool,
}

impl Default for UsageOptions {
    fn default() -> Self {
        Self {
            count_thoughts_in_completion: true,
        }
    }
}

pub(crate) fn from_openai(usage: &OpenAiUsage, options: UsageOptions) -> Usage {
    let prompt = usage.prompt_tokens.unwrap_or(0);
    let reported_completion = usage.completion_tokens.unwrap_or(0);
    let thoughts = usage
        .completion_tokens_details
        .as_ref()
        .and_then(|details| details.reasoning_tokens)
        .unwrap_or(0);

    let (completion, without_thoughts) = if options.count_thoughts_in_completion {
        (reported_completion.saturating_add(thoughts), reported_completion)
    } else {
        (
            reported_completion,
            reported_completion.saturating_sub(thoughts),
        )
    };

    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        completion_tokens_without_thoughts: without_thoughts,
        total_tokens: usage
            .total_tokens
            .unwrap_or(prompt.saturating_add(reported_completion)),
        thoughts_tokens: thoughts,
    }
}

pub(crate) fn from_anthropic(usage: &AnthropicUsage) -> Usage {
    let input = usage.input_tokens.unwrap_or(0);
    let output = usage.output_tokens.unwrap_or(0);
    let cache_creation = usage.cache_creation_input_tokens.unwrap_or(0);
    let cache_read = usage.cache_read_input_tokens.unwrap_or(0);

    Usage {
        prompt_tokens: input,
        completion_tokens: output,
        completion_tokens_without_thoughts: output,
        total_tokens: input
            .saturating_add(cache_creation)
            .saturating_add(cache_read)
            .saturating_add(output),
        thoughts_tokens: 0,
    }
}

pub(crate) fn from_google(metadata: &GeminiUsageMetadata) -> Usage {
    let prompt = metadata.prompt_token_count.unwrap_or(0);
    let candidates = metadata.candidates_token_count.unwrap_or(0);
    let thoughts = metadata.thoughts_token_count.unwrap_or(0);
    let completion = candidates.saturating_add(thoughts);
    let total = prompt.saturating_add(completion);
    if let Some(reported) = metadata.total_token_count {
        if reported != total {
            tracing::debug!(
                reported,
                computed = total,
                "gemini totalTokenCount differs from component sum"
            );
        }
    }

    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        completion_tokens_without_thoughts: candidates,
        total_tokens: total,
        thoughts_tokens: thoughts,
    }
}
