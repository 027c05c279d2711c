mod common;

use std::collections::HashMap;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use common::{Canned, MockTransport, header, openai_completion};
use kotoba_bridge::types::{
    ContentPart, FunctionCall, FunctionDefinition, FunctionParameters, InputMessage,
    MessageContent, PromptOptions, ToolCallMode,
};
use kotoba_bridge::{LLMClient, LLMError, parse_provider_options};
use serde_json::{Value, json};

fn weather_tool() -> FunctionDefinition {
    FunctionDefinition::new(
        "get_weather",
        "Look up the current weather",
        FunctionParameters {
            additional_properties: Some(false),
            ..FunctionParameters::object(
                [("city".to_string(), json!({"type": "string"}))]
                    .into_iter()
                    .collect(),
                vec!["city".to_string()],
            )
        },
    )
}

fn hello_prompt() -> PromptOptions {
    PromptOptions::new(vec![InputMessage::user("Hello")]).with_system_prompt("Be brief.")
}

async fn dispatch(
    transport: &std::sync::Arc<MockTransport>,
    prompt: PromptOptions,
    options: Value,
) -> Result<kotoba_bridge::StandardizedResponse, LLMError> {
    let options = parse_provider_options(options).expect("valid provider options");
    LLMClient::new(transport.dyn_transport())
        .send_prompt(prompt, &options)
        .await
}

#[tokio::test]
async fn openai_places_system_prompt_in_developer_role() {
    let transport = MockTransport::json(openai_completion("Hi there"));
    let response = dispatch(
        &transport,
        hello_prompt().with_temperature(0.7),
        json!({"provider": "openai", "apiKey": "sk-test", "model": "gpt-4o", "reasoningEffort": "low"}),
    )
    .await
    .expect("response");

    assert_eq!(response.message.role, "assistant");
    assert_eq!(response.message.content, "Hi there");
    assert!(response.tool_calls.is_none());
    assert!(response.reasoning.is_none());
    let usage = response.usage.expect("usage");
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (10, 5, 15));

    let request = transport.only_request();
    assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
    assert_eq!(header(&request, "authorization"), Some("Bearer sk-test"));
    let body = request.json_body().expect("json body");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0], json!({"role": "developer", "content": "Be brief."}));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "Hello"}));
    assert_eq!(body["reasoning_effort"], "low");
    assert_eq!(body["temperature"], json!(0.7));
    assert!(body.get("stream").is_none());
}

#[tokio::test]
async fn openai_compatible_providers_use_system_role_and_fixed_base_urls() {
    let cases = [
        ("fireworks", "https://api.fireworks.ai/inference/v1/chat/completions"),
        ("deepseek", "https://api.deepseek.com/chat/completions"),
        ("xai", "https://api.x.ai/v1/chat/completions"),
    ];
    for (provider, url) in cases {
        let transport = MockTransport::json(openai_completion("ok"));
        dispatch(
            &transport,
            hello_prompt(),
            json!({"provider": provider, "apiKey": "k", "customModel": "some-model"}),
        )
        .await
        .expect("response");

        let request = transport.only_request();
        assert_eq!(request.url, url, "{provider}");
        let body = request.json_body().expect("json body");
        assert_eq!(body["messages"][0]["role"], "system", "{provider}");
        assert_eq!(body["model"], "some-model");
    }
}

#[tokio::test]
async fn openrouter_sends_routing_and_nested_reasoning_without_double_counting() {
    let mut completion = openai_completion("done");
    completion["usage"] = json!({
        "prompt_tokens": 10,
        "completion_tokens": 50,
        "total_tokens": 60,
        "completion_tokens_details": {"reasoning_tokens": 20}
    });
    let transport = MockTransport::json(completion);
    let response = dispatch(
        &transport,
        hello_prompt(),
        json!({
            "provider": "openrouter",
            "apiKey": "or-key",
            "customModel": "deepseek/deepseek-r1",
            "reasoningEffort": "high",
            "providerOptions": {"order": ["fireworks", "together"], "ignore": ["azure"]},
            "headers": {"X-Title": "kotoba"}
        }),
    )
    .await
    .expect("response");

    let usage = response.usage.expect("usage");
    assert_eq!(usage.completion_tokens, 50);
    assert_eq!(usage.completion_tokens_without_thoughts, 30);
    assert_eq!(usage.thoughts_tokens, 20);
    assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);

    let request = transport.only_request();
    assert_eq!(request.url, "https://openrouter.ai/api/v1/chat/completions");
    assert_eq!(header(&request, "x-title"), Some("kotoba"));
    let body = request.json_body().expect("json body");
    assert_eq!(body["provider"], json!({"order": ["fireworks", "together"], "ignore": ["azure"]}));
    assert_eq!(body["reasoning"], json!({"effort": "high"}));
    assert!(body.get("reasoning_effort").is_none());
    assert_eq!(body["messages"][0]["role"], "system");
}

// First-party OpenAI already counts reasoning inside completion_tokens, yet the
// reported total is kept as-is while the thoughts are added on top, so here
// total_tokens != prompt_tokens + completion_tokens.
#[tokio::test]
async fn first_party_openai_adds_reasoning_tokens_to_completion() {
    let mut completion = openai_completion("done");
    completion["usage"] = json!({
        "prompt_tokens": 7,
        "completion_tokens": 5,
        "total_tokens": 12,
        "completion_tokens_details": {"reasoning_tokens": 3}
    });
    let transport = MockTransport::json(completion);
    let response = dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "openai", "apiKey": "k", "model": "o3-mini"}),
    )
    .await
    .expect("response");

    let usage = response.usage.expect("usage");
    assert_eq!(usage.completion_tokens, 8);
    assert_eq!(usage.completion_tokens_without_thoughts, 5);
    assert_eq!(usage.thoughts_tokens, 3);
    assert_eq!(usage.total_tokens, 12);
}

#[tokio::test]
async fn openai_tool_calls_and_tagged_reasoning_are_normalized() {
    let transport = MockTransport::json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "<think>The user wants weather.</think>Checking now.",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                }]
            }
        }]
    }));
    let response = dispatch(
        &transport,
        hello_prompt()
            .with_tools(vec![weather_tool()])
            .with_tool_call_mode(ToolCallMode::Any),
        json!({"provider": "openai", "apiKey": "k", "model": "gpt-4.1"}),
    )
    .await
    .expect("response");

    assert_eq!(response.message.content, "Checking now.");
    assert_eq!(response.reasoning.as_deref(), Some("The user wants weather."));
    assert_eq!(
        response.tool_calls,
        Some(vec![FunctionCall::new("call_1", "get_weather", r#"{"city":"Paris"}"#)])
    );
    assert!(response.usage.is_none());

    let body = transport.only_request().json_body().expect("json body");
    assert_eq!(body["tool_choice"], "required");
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["function"]["name"], "get_weather");
}

#[tokio::test]
async fn field_reasoning_wins_and_keeps_content() {
    let transport = MockTransport::json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "4",
                "reasoning_content": "2 + 2 = 4"
            }
        }]
    }));
    let response = dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "deepseek", "apiKey": "k", "model": "deepseek-reasoner"}),
    )
    .await
    .expect("response");
    assert_eq!(response.message.content, "4");
    assert_eq!(response.reasoning.as_deref(), Some("2 + 2 = 4"));
}

#[tokio::test]
async fn anthropic_request_shape_and_usage() {
    let transport = MockTransport::json(json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [
            {"type": "text", "text": "Part one. "},
            {"type": "text", "text": "Part two."}
        ],
        "usage": {
            "input_tokens": 12,
            "output_tokens": 8,
            "cache_creation_input_tokens": 3,
            "cache_read_input_tokens": 5
        }
    }));
    let image = general_purpose::STANDARD.encode(b"\x89PNG fake image");
    let prompt = PromptOptions::new(vec![InputMessage::user_parts(vec![
        ContentPart::text("What is this?"),
        ContentPart::image_url(format!("data:image/png;base64,{image}")),
    ])])
    .with_system_prompt("You are a vision model.");
    let response = dispatch(
        &transport,
        prompt,
        json!({"provider": "anthropic", "apiKey": "ant-key", "model": "claude-3-5-sonnet-20241022"}),
    )
    .await
    .expect("response");

    assert_eq!(response.message.content, "Part one. Part two.");
    let usage = response.usage.expect("usage");
    assert_eq!(usage.prompt_tokens, 12);
    assert_eq!(usage.completion_tokens, 8);
    assert_eq!(usage.total_tokens, 28);

    let request = transport.only_request();
    assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
    assert_eq!(header(&request, "x-api-key"), Some("ant-key"));
    assert_eq!(header(&request, "anthropic-version"), Some("2023-06-01"));
    assert_eq!(header(&request, "anthropic-beta"), None);
    let body = request.json_body().expect("json body");
    assert_eq!(body["system"], "You are a vision model.");
    assert_eq!(body["max_tokens"], 8192);
    assert_eq!(
        body["messages"][0]["content"][1],
        json!({"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": image}})
    );
}

#[tokio::test]
async fn anthropic_max_tokens_policy_and_beta_header() {
    let reply = json!({"content": [{"type": "text", "text": "ok"}]});

    let transport = MockTransport::json(reply.clone());
    dispatch(
        &transport,
        hello_prompt()
            .with_anthropic_max_tokens(1000)
            .with_temperature(0.1),
        json!({"provider": "anthropic", "apiKey": "k", "model": "claude-3-7-sonnet-20250219"}),
    )
    .await
    .expect("response");
    let request = transport.only_request();
    assert_eq!(
        header(&request, "anthropic-beta"),
        Some("token-efficient-tools-2025-02-19")
    );
    let body = request.json_body().expect("body");
    assert_eq!(body["max_tokens"], 1000);
    assert_eq!(body["temperature"], json!(0.1));

    let transport = MockTransport::json(reply.clone());
    dispatch(
        &transport,
        hello_prompt()
            .with_anthropic_max_tokens(1000)
            .with_tools(vec![weather_tool()]),
        json!({"provider": "anthropic", "apiKey": "k", "model": "claude-sonnet-4-20250514"}),
    )
    .await
    .expect("response");
    let body = transport.only_request().json_body().expect("body");
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["tool_choice"], json!({"type": "auto"}));
    assert_eq!(body["tools"][0]["name"], "get_weather");
    assert_eq!(body["tools"][0]["input_schema"]["required"], json!(["city"]));

    let transport = MockTransport::json(reply);
    dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "anthropic", "apiKey": "k", "customModel": "claude-next"}),
    )
    .await
    .expect("response");
    let body = transport.only_request().json_body().expect("body");
    assert_eq!(body["max_tokens"], 4096);
}

#[tokio::test]
async fn anthropic_tool_use_becomes_tool_call() {
    let transport = MockTransport::json(json!({
        "content": [
            {"type": "text", "text": "Let me check."},
            {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Oslo"}}
        ]
    }));
    let response = dispatch(
        &transport,
        hello_prompt().with_tools(vec![weather_tool()]),
        json!({"provider": "anthropic", "apiKey": "k", "model": "claude-sonnet-4-20250514"}),
    )
    .await
    .expect("response");
    assert_eq!(
        response.tool_calls,
        Some(vec![FunctionCall::new("toolu_1", "get_weather", r#"{"city":"Oslo"}"#)])
    );
}

#[tokio::test]
async fn assistant_image_is_rejected_for_anthropic() {
    let transport = MockTransport::json(json!({"content": []}));
    let prompt = PromptOptions::new(vec![InputMessage::Assistant {
        content: MessageContent::Parts(vec![ContentPart::image_url("QUJD")]),
    }]);
    let err = dispatch(
        &transport,
        prompt,
        json!({"provider": "anthropic", "apiKey": "k", "model": "claude-sonnet-4-20250514"}),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "unsupported message content for role assistant");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn google_request_shape_and_function_calls() {
    let transport = MockTransport::json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"functionCall": {"name": "get_weather", "args": {"city": "Rome"}}}
            ]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 6, "thoughtsTokenCount": 4, "totalTokenCount": 30}
    }));
    let prompt = PromptOptions::new(vec![
        InputMessage::user("Weather in Rome?"),
        InputMessage::user_parts(vec![ContentPart::image_url("QUJD")]),
    ])
    .with_system_prompt("Use tools.")
    .with_tools(vec![weather_tool()])
    .with_tool_call_mode(ToolCallMode::Any)
    .with_temperature(0.3);
    let response = dispatch(
        &transport,
        prompt,
        json!({"provider": "google", "apiKey": "g-key", "model": "gemini-2.5-flash"}),
    )
    .await
    .expect("response");

    assert_eq!(response.message.content, "");
    assert_eq!(
        response.tool_calls,
        Some(vec![FunctionCall::new("function_call", "get_weather", r#"{"city":"Rome"}"#)])
    );
    let usage = response.usage.expect("usage");
    assert_eq!(usage.completion_tokens, 10);
    assert_eq!(usage.completion_tokens_without_thoughts, 6);
    assert_eq!(usage.total_tokens, 30);

    let request = transport.only_request();
    assert_eq!(
        request.url,
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
    );
    assert_eq!(header(&request, "x-goog-api-key"), Some("g-key"));
    let body = request.json_body().expect("json body");
    assert_eq!(body["systemInstruction"], json!({"parts": [{"text": "Use tools."}]}));
    assert_eq!(
        body["contents"][1]["parts"][0],
        json!({"inlineData": {"mimeType": "image/jpeg", "data": "QUJD"}})
    );
    assert_eq!(
        body["toolConfig"],
        json!({"functionCallingConfig": {"mode": "ANY", "allowedFunctionNames": ["get_weather"]}})
    );
    let declaration = &body["tools"][0]["functionDeclarations"][0];
    assert_eq!(declaration["name"], "get_weather");
    assert!(declaration["parameters"].get("additionalProperties").is_none());
    assert_eq!(body["generationConfig"], json!({"temperature": 0.3}));
}

#[tokio::test]
async fn google_function_exchange_is_dropped_for_openai() {
    let transport = MockTransport::json(openai_completion("ok"));
    let prompt = PromptOptions::new(vec![
        InputMessage::user("Weather?"),
        InputMessage::GoogleFunctionCall {
            id: Some("c1".to_string()),
            name: "get_weather".to_string(),
            args: Default::default(),
        },
        InputMessage::GoogleFunctionResponse {
            id: Some("c1".to_string()),
            name: "get_weather".to_string(),
            response: Default::default(),
        },
    ]);
    dispatch(
        &transport,
        prompt,
        json!({"provider": "openai", "apiKey": "k", "model": "gpt-4o"}),
    )
    .await
    .expect("response");
    let body = transport.only_request().json_body().expect("body");
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn azure_uses_deployment_url_and_api_key_header() {
    let transport = MockTransport::json(openai_completion("ok"));
    dispatch(
        &transport,
        hello_prompt(),
        json!({
            "provider": "azure_openai",
            "endpoint": "https://contoso.openai.azure.com/",
            "deployment": "gpt-4o-prod",
            "apiVersion": "2024-10-21",
            "apiKey": "az-key",
            "customModel": "gpt-4o"
        }),
    )
    .await
    .expect("response");

    let request = transport.only_request();
    assert_eq!(
        request.url,
        "https://contoso.openai.azure.com/openai/deployments/gpt-4o-prod/chat/completions?api-version=2024-10-21"
    );
    assert_eq!(header(&request, "api-key"), Some("az-key"));
    assert_eq!(header(&request, "authorization"), None);
}

#[tokio::test]
async fn custom_provider_accepts_base_url_alias() {
    let transport = MockTransport::json(openai_completion("local"));
    let response = dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "custom", "baseURL": "http://localhost:11434/v1/", "apiKey": "none", "customModel": "llama3"}),
    )
    .await
    .expect("response");
    assert_eq!(response.message.content, "local");
    assert_eq!(transport.only_request().url, "http://localhost:11434/v1/chat/completions");
}

#[tokio::test]
async fn unknown_provider_is_rejected_by_name() {
    let err = parse_provider_options(json!({"provider": "unsupported", "apiKey": "k", "model": "gpt-4o"}))
        .unwrap_err();
    assert!(matches!(err, LLMError::UnsupportedProvider { .. }));
    assert_eq!(err.to_string(), "Provider unsupported is not supported yet");
}

#[tokio::test]
async fn vendor_errors_are_classified() {
    let transport = MockTransport::new(Canned::Raw {
        status: 429,
        body: json!({"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}})
            .to_string(),
        headers: HashMap::from([("retry-after".to_string(), "7".to_string())]),
    });
    let err = dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "openai", "apiKey": "k", "model": "gpt-4o"}),
    )
    .await
    .unwrap_err();
    match err {
        LLMError::RateLimit { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }

    let transport = MockTransport::new(Canned::Json {
        status: 401,
        body: json!({"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}),
    });
    let err = dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "anthropic", "apiKey": "bad", "model": "claude-sonnet-4-20250514"}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LLMError::Auth { .. }));
}

#[tokio::test]
async fn duration_is_always_reported() {
    let transport = MockTransport::json(openai_completion("ok"));
    let response = dispatch(
        &transport,
        hello_prompt(),
        json!({"provider": "openai", "apiKey": "k", "model": "gpt-4o"}),
    )
    .await
    .expect("response");
    let value = serde_json::to_value(&response).expect("serialize");
    assert!(value["durationMs"].is_u64());
}
