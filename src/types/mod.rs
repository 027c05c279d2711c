//! Provider-agnostic values flowing into and out of [`crate::send_prompt`].
//!
//! Every type here is constructed per call and discarded afterwards. The serde forms
//! follow the JSON shapes callers already use with OpenAI-style chat APIs, so a message
//! list can be deserialized straight from a request body.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One conversation turn in neutral form.
///
/// `user` and `assistant` carry text or a list of text/image parts. The two
/// `google_function_*` variants encode a prior Gemini tool exchange and are dropped by
/// every schema other than Google's.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::types::{ContentPart, InputMessage};
///
/// let text: InputMessage = serde_json::from_value(serde_json::json!({
///     "role": "user",
///     "content": "hello"
/// })).unwrap();
/// assert_eq!(text, InputMessage::user("hello"));
///
/// let image = InputMessage::user_parts(vec![
///     ContentPart::text("What is this?"),
///     ContentPart::image_url("data:image/png;base64,AAAA"),
/// ]);
/// assert_eq!(image.role(), "user");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum InputMessage {
    User {
        content: MessageContent,
    },
    Assistant {
        content: MessageContent,
    },
    GoogleFunctionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    GoogleFunctionResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        #[serde(default)]
        response: Map<String, Value>,
    },
}

impl InputMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::User {
            content: MessageContent::Parts(parts),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: MessageContent::Text(text.into()),
        }
    }

    /// Wire role tag, as used in error messages.
    pub fn role(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::GoogleFunctionCall { .. } => "google_function_call",
            Self::GoogleFunctionResponse { .. } => "google_function_response",
        }
    }
}

/// Message body: plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Single content part in OpenAI's `content[]` notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image reference; either a `data:` URL or a bare base64 payload.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    /// OpenAI detail hint (`low`, `high`, `auto`); ignored by other schemas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tool declaration in OpenAI's `{type: "function", function: {...}}` shape.
///
/// Each vendor schema re-shapes this into its own tool format.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::types::{FunctionDefinition, FunctionParameters};
/// use serde_json::json;
///
/// let weather = FunctionDefinition::new(
///     "get_weather",
///     "Look up the current weather",
///     FunctionParameters::object(
///         [("location".to_string(), json!({"type": "string"}))].into_iter().collect(),
///         vec!["location".to_string()],
///     ),
/// );
/// let value = serde_json::to_value(&weather).unwrap();
/// assert_eq!(value["type"], "function");
/// assert_eq!(value["function"]["parameters"]["required"], json!(["location"]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    #[serde(rename = "type", default)]
    pub kind: FunctionKind,
    pub function: FunctionSpec,
}

impl FunctionDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: FunctionParameters,
    ) -> Self {
        Self {
            kind: FunctionKind::Function,
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
                strict: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// The only tool kind understood by every schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    #[default]
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: FunctionParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// JSON-Schema object describing a function's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameters {
    #[serde(rename = "type", default = "object_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,
}

impl FunctionParameters {
    pub fn object(properties: Map<String, Value>, required: Vec<String>) -> Self {
        Self {
            kind: object_type(),
            properties,
            required,
            additional_properties: None,
        }
    }

    /// Schema without `additionalProperties`, as Gemini rejects that keyword.
    pub(crate) fn without_additional_properties(&self) -> Self {
        Self {
            additional_properties: None,
            ..self.clone()
        }
    }
}

fn object_type() -> String {
    "object".to_string()
}

/// Whether the model must call one of the declared tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolCallMode {
    /// Force a call to one of the declared functions.
    Any,
    /// Let the model decide.
    #[default]
    Auto,
}

/// Receives each streamed text delta, in arrival order.
pub type StreamingCallback = Box<dyn FnMut(&str) + Send>;

/// Request-scoped options for one `send_prompt` call.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use kotoba_bridge::types::{InputMessage, PromptOptions};
///
/// let seen = Arc::new(Mutex::new(String::new()));
/// let sink = Arc::clone(&seen);
/// let prompt = PromptOptions::new(vec![InputMessage::user("hi")])
///     .with_system_prompt("Be brief.")
///     .with_streaming(move |delta| sink.lock().unwrap().push_str(delta));
/// assert!(prompt.stream);
/// assert!(prompt.on_streaming_content.is_some());
/// ```
#[derive(Default)]
pub struct PromptOptions {
    pub messages: Vec<InputMessage>,
    pub system_prompt: Option<String>,
    /// Declared tools; an empty list means no tools.
    pub tools: Vec<FunctionDefinition>,
    pub tool_call_mode: ToolCallMode,
    pub temperature: Option<f64>,
    /// Overrides the Anthropic `max_tokens` value; ignored by other schemas.
    pub anthropic_max_tokens: Option<u32>,
    pub stream: bool,
    pub on_streaming_content: Option<StreamingCallback>,
}

impl PromptOptions {
    pub fn new(messages: Vec<InputMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<FunctionDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_call_mode(mut self, mode: ToolCallMode) -> Self {
        self.tool_call_mode = mode;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_anthropic_max_tokens(mut self, max_tokens: u32) -> Self {
        self.anthropic_max_tokens = Some(max_tokens);
        self
    }

    /// Enables streaming and installs the delta callback.
    pub fn with_streaming<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.stream = true;
        self.on_streaming_content = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for PromptOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptOptions")
            .field("messages", &self.messages)
            .field("system_prompt", &self.system_prompt)
            .field("tools", &self.tools)
            .field("tool_call_mode", &self.tool_call_mode)
            .field("temperature", &self.temperature)
            .field("anthropic_max_tokens", &self.anthropic_max_tokens)
            .field("stream", &self.stream)
            .field(
                "on_streaming_content",
                &self.on_streaming_content.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

/// Universal result of `send_prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedResponse {
    pub message: ResponseMessage,
    #[serde(rename = "tool_calls", default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<FunctionCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub duration_ms: u64,
}

/// Assistant text; the role is always `assistant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

impl ResponseMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Tool call requested by the model; `arguments` is a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: FunctionKind,
    pub function: FunctionCallBody,
}

impl FunctionCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: FunctionKind::Function,
            function: FunctionCallBody {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallBody {
    pub name: String,
    pub arguments: String,
}

/// Token accounting after per-vendor reconciliation.
///
/// `total_tokens == prompt_tokens + completion_tokens` holds for records built from
/// consistent vendor reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub completion_tokens_without_thoughts: u64,
    pub total_tokens: u64,
    pub thoughts_tokens: u64,
}
