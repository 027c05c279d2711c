//! Neutral messages to vendor message schemas.
//!
//! [`transform_messages`] is the only place that knows how each [`InputMessage`]
//! variant maps onto the three wire schemas. Every `match` below is exhaustive over
//! both the target and the message variant, so a new variant fails to compile until
//! each schema handles it.

use std::fmt;
use std::str::FromStr;

use crate::error::LLMError;
use crate::image::normalize_image;
use crate::provider::anthropic_messages::types::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicRole,
};
use crate::provider::google_gemini::types::{
    GeminiContent, GeminiFunctionCall, GeminiFunctionResponse, GeminiInlineData, GeminiPart,
    GeminiRole,
};
use crate::provider::openai_chat::types::{OpenAiMessage, OpenAiRole};
use crate::types::{ContentPart, InputMessage, MessageContent};

/// Canonical wire schema a provider's messages are shaped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformTarget {
    OpenAi,
    Anthropic,
    Google,
}

impl TransformTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for TransformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformTarget {
    type Err = LLMError;

    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::transform::TransformTarget;
    ///
    /// assert_eq!("google".parse::<TransformTarget>().unwrap(), TransformTarget::Google);
    /// let err = "unsupported".parse::<TransformTarget>().unwrap_err();
    /// assert_eq!(err.to_string(), "Unhandled provider case: unsupported");
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            other => Err(LLMError::validation(format!(
                "Unhandled provider case: {other}"
            ))),
        }
    }
}

/// Role used for a system prompt inside an OpenAI-schema message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRole {
    System,
    Developer,
}

/// Vendor-native messages, tagged by the schema they were built for.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformedMessages {
    /// System prompt already prepended as a message.
    OpenAi(Vec<OpenAiMessage>),
    /// System prompt travels as the top-level `system` field.
    Anthropic {
        system: Option<String>,
        messages: Vec<AnthropicMessage>,
    },
    /// System prompt travels as `systemInstruction`.
    Google {
        system_instruction: Option<String>,
        contents: Vec<GeminiContent>,
    },
}

impl TransformedMessages {
    pub fn target(&self) -> TransformTarget {
        match self {
            Self::OpenAi(_) => TransformTarget::OpenAi,
            Self::Anthropic { .. } => TransformTarget::Anthropic,
            Self::Google { .. } => TransformTarget::Google,
        }
    }

    pub(crate) fn into_openai(self) -> Result<Vec<OpenAiMessage>, LLMError> {
        match self {
            Self::OpenAi(messages) => Ok(messages),
            _ => Err(mismatch("OpenAI")),
        }
    }

    pub(crate) fn into_anthropic(
        self,
    ) -> Result<(Option<String>, Vec<AnthropicMessage>), LLMError> {
        match self {
            Self::Anthropic { system, messages } => Ok((system, messages)),
            _ => Err(mismatch("Anthropic")),
        }
    }

    pub(crate) fn into_google(self) -> Result<(Option<String>, Vec<GeminiContent>), LLMError> {
        match self {
            Self::Google {
                system_instruction,
                contents,
            } => Ok((system_instruction, contents)),
            _ => Err(mismatch("Google")),
        }
    }
}

fn mismatch(schema: &str) -> LLMError {
    LLMError::Internal {
        message: format!("Messages were not properly transformed for {schema}"),
    }
}

/// Shapes `messages` for `target`.
///
/// `system_role` only matters for the OpenAI schema; the other two carry the system
/// prompt outside the message list.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] naming the role when a message cannot be expressed
/// in the target schema.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::transform::{SystemRole, TransformTarget, TransformedMessages, transform_messages};
/// use kotoba_bridge::types::InputMessage;
///
/// let transformed = transform_messages(
///     &[InputMessage::user("hi")],
///     TransformTarget::OpenAi,
///     Some("Be brief."),
///     SystemRole::Developer,
/// )
/// .unwrap();
/// let TransformedMessages::OpenAi(messages) = transformed else { unreachable!() };
/// assert_eq!(messages.len(), 2);
/// ```
pub fn transform_messages(
    messages: &[InputMessage],
    target: TransformTarget,
    system_prompt: Option<&str>,
    system_role: SystemRole,
) -> Result<TransformedMessages, LLMError> {
    let system = system_prompt.map(str::to_string);
    match target {
        TransformTarget::OpenAi => Ok(TransformedMessages::OpenAi(to_openai(
            messages,
            system,
            system_role,
        ))),
        TransformTarget::Anthropic => Ok(TransformedMessages::Anthropic {
            system,
            messages: to_anthropic(messages)?,
        }),
        TransformTarget::Google => Ok(TransformedMessages::Google {
            system_instruction: system,
            contents: to_google(messages)?,
        }),
    }
}

fn to_openai(
    messages: &[InputMessage],
    system: Option<String>,
    system_role: SystemRole,
) -> Vec<OpenAiMessage> {
    let system_message = system.map(|text| OpenAiMessage {
        role: match system_role {
            SystemRole::System => OpenAiRole::System,
            SystemRole::Developer => OpenAiRole::Developer,
        },
        content: MessageContent::Text(text),
    });

    let converted = messages.iter().filter_map(|message| match message {
        InputMessage::User { content } => Some(OpenAiMessage {
            role: OpenAiRole::User,
            content: content.clone(),
        }),
        InputMessage::Assistant { content } => Some(OpenAiMessage {
            role: OpenAiRole::Assistant,
            content: content.clone(),
        }),
        InputMessage::GoogleFunctionCall { .. } | InputMessage::GoogleFunctionResponse { .. } => {
            None
        }
    });

    system_message.into_iter().chain(converted).collect()
}

fn to_anthropic(messages: &[InputMessage]) -> Result<Vec<AnthropicMessage>, LLMError> {
    let mut converted = Vec::with_capacity(messages.len());
    for message in messages {
        let (role, content) = match message {
            InputMessage::User { content } => (AnthropicRole::User, content),
            InputMessage::Assistant { content } => (AnthropicRole::Assistant, content),
            InputMessage::GoogleFunctionCall { .. }
            | InputMessage::GoogleFunctionResponse { .. } => continue,
        };

        let blocks = match content {
            MessageContent::Text(text) => vec![AnthropicContentBlock::Text { text: text.clone() }],
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => {
                        Ok(AnthropicContentBlock::Text { text: text.clone() })
                    }
                    ContentPart::ImageUrl { image_url } if role == AnthropicRole::User => {
                        let image = normalize_image(&image_url.url);
                        Ok(AnthropicContentBlock::Image {
                            source: AnthropicImageSource {
                                kind: "base64",
                                media_type: image.mime_type,
                                data: image.base64_data,
                            },
                        })
                    }
                    ContentPart::ImageUrl { .. } => Err(unsupported_content(message)),
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        converted.push(AnthropicMessage {
            role,
            content: blocks,
        });
    }
    Ok(converted)
}

fn to_google(messages: &[InputMessage]) -> Result<Vec<GeminiContent>, LLMError> {
    let mut converted = Vec::with_capacity(messages.len());
    for message in messages {
        let content = match message {
            InputMessage::User { content } => GeminiContent {
                role: GeminiRole::User,
                parts: google_parts(message, content)?,
            },
            InputMessage::Assistant { content } => GeminiContent {
                role: GeminiRole::Model,
                parts: google_parts(message, content)?,
            },
            InputMessage::GoogleFunctionCall { id, name, args } => GeminiContent {
                role: GeminiRole::Model,
                parts: vec![GeminiPart::FunctionCall(GeminiFunctionCall {
                    id: id.clone(),
                    name: Some(name.clone()),
                    args: args.clone(),
                })],
            },
            InputMessage::GoogleFunctionResponse { id, name, response } => GeminiContent {
                role: GeminiRole::User,
                parts: vec![GeminiPart::FunctionResponse(GeminiFunctionResponse {
                    id: id.clone(),
                    name: name.clone(),
                    response: response.clone(),
                })],
            },
        };
        if !content.parts.is_empty() {
            converted.push(content);
        }
    }
    Ok(converted)
}

fn google_parts(
    message: &InputMessage,
    content: &MessageContent,
) -> Result<Vec<GeminiPart>, LLMError> {
    let accepts_images = matches!(message, InputMessage::User { .. });
    match content {
        MessageContent::Text(text) => Ok(vec![GeminiPart::Text(text.clone())]),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => Ok(GeminiPart::Text(text.clone())),
                ContentPart::ImageUrl { image_url } if accepts_images => {
                    let image = normalize_image(&image_url.url);
                    Ok(GeminiPart::InlineData(GeminiInlineData {
                        mime_type: image.mime_type,
                        data: image.base64_data,
                    }))
                }
                ContentPart::ImageUrl { .. } => Err(unsupported_content(message)),
            })
            .collect(),
    }
}

fn unsupported_content(message: &InputMessage) -> LLMError {
    LLMError::validation(format!(
        "unsupported message content for role {}",
        message.role()
    ))
}
