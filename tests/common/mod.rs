#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use kotoba_bridge::error::LLMError;
use kotoba_bridge::http::{
    DynHttpTransport, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};
use serde_json::Value;

/// 预置的供应商响应
#[derive(Clone)]
pub enum Canned {
    Json { status: u16, body: Value },
    Raw { status: u16, body: String, headers: HashMap<String, String> },
    /// 每个元素是一个原始网络分片
    Sse(Vec<String>),
}

/// 记录请求并回放预置响应的内存传输层
pub struct MockTransport {
    canned: Canned,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(canned: Canned) -> Arc<Self> {
        Arc::new(Self {
            canned,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn json(body: Value) -> Arc<Self> {
        Self::new(Canned::Json { status: 200, body })
    }

    /// 每个 payload 以一帧 `data:` 事件发送，最后追加 `[DONE]`
    pub fn sse_data(payloads: &[Value]) -> Arc<Self> {
        let mut chunks: Vec<String> = payloads
            .iter()
            .map(|payload| format!("data: {payload}\n\n"))
            .collect();
        chunks.push("data: [DONE]\n\n".to_string());
        Self::new(Canned::Sse(chunks))
    }

    pub fn dyn_transport(self: &Arc<Self>) -> DynHttpTransport {
        self.clone()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn only_request(&self) -> HttpRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one outbound request");
        requests.into_iter().next().expect("one request")
    }

    fn record(&self, request: HttpRequest) {
        self.requests.lock().expect("requests lock").push(request);
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        self.record(request);
        match &self.canned {
            Canned::Json { status, body } => Ok(HttpResponse {
                status: *status,
                headers: HashMap::new(),
                body: body.to_string().into_bytes(),
            }),
            Canned::Raw {
                status,
                body,
                headers,
            } => Ok(HttpResponse {
                status: *status,
                headers: headers.clone(),
                body: body.clone().into_bytes(),
            }),
            Canned::Sse(_) => panic!("non-streaming call against a streaming fixture"),
        }
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        self.record(request);
        let (status, headers, chunks) = match &self.canned {
            Canned::Sse(chunks) => (200, HashMap::new(), chunks.clone()),
            Canned::Json { status, body } => (*status, HashMap::new(), vec![body.to_string()]),
            Canned::Raw {
                status,
                body,
                headers,
            } => (*status, headers.clone(), vec![body.clone()]),
        };
        let items: Vec<Result<Vec<u8>, LLMError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into_bytes())).collect();
        Ok(HttpStreamResponse {
            status,
            headers,
            body: Box::pin(stream::iter(items)),
        })
    }
}

/// 线程安全的流式回调收集器
pub fn collector() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |delta: &str| {
        sink.lock().expect("collector lock").push(delta.to_string())
    })
}

pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

pub fn openai_completion(content: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}
