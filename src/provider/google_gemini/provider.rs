use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpResponse, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::{LLMProvider, ProviderReply, ProviderRequest, retry::retry_after_from_headers};
use crate::stream::collect_stream_text;

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::stream::consume_stream;
use super::types::GeminiGenerateContentResponse;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub(crate) const PROVIDER_NAME: &str = "google_gemini";

/// Credential attached to every Gemini request.
#[derive(Clone, PartialEq, Eq)]
pub enum GeminiAuth {
    /// AI Studio key, sent as `x-goog-api-key`.
    ApiKey(String),
    /// OAuth access token for Vertex AI, sent as `Authorization: Bearer`.
    Bearer(String),
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(..)"),
            Self::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

/// Google Gemini GenerateContent provider implementation.
pub struct GoogleGeminiProvider {
    pub(crate) transport: DynHttpTransport,
    /// Collection URL that model names are appended to.
    pub(crate) models_url: String,
    pub(crate) auth: GeminiAuth,
    pub(crate) headers: HashMap<String, String>,
}

impl GoogleGeminiProvider {
    /// Creates a provider that targets the default Google Generative Language endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            models_url: models_url_for_base(DEFAULT_BASE_URL),
            auth: GeminiAuth::ApiKey(api_key.into()),
            headers: HashMap::new(),
        }
    }

    /// Creates a provider for a Vertex AI project.
    ///
    /// The `global` location uses the location-less host.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::http::reqwest::default_dyn_transport;
    /// use kotoba_bridge::provider::google_gemini::GoogleGeminiProvider;
    ///
    /// let provider = GoogleGeminiProvider::vertex(
    ///     default_dyn_transport().unwrap(),
    ///     "my-project",
    ///     "us-central1",
    ///     "ya29.token",
    /// );
    /// assert_eq!(
    ///     provider.endpoint("gemini-2.5-flash"),
    ///     "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent"
    /// );
    /// ```
    pub fn vertex(
        transport: DynHttpTransport,
        project: &str,
        location: &str,
        access_token: impl Into<String>,
    ) -> Self {
        let host = if location == "global" {
            "https://aiplatform.googleapis.com".to_string()
        } else {
            format!("https://{location}-aiplatform.googleapis.com")
        };
        Self {
            transport,
            models_url: format!(
                "{host}/v1/projects/{project}/locations/{location}/publishers/google/models"
            ),
            auth: GeminiAuth::Bearer(access_token.into()),
            headers: HashMap::new(),
        }
    }

    /// 附加请求头，覆盖同名默认头
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Builds the non-streaming endpoint URL for GenerateContent.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.models_url, normalize_model(model))
    }

    /// Builds the streaming endpoint URL (SSE) for GenerateContent.
    pub fn stream_endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.models_url,
            normalize_model(model)
        )
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        match &self.auth {
            GeminiAuth::ApiKey(key) => {
                headers.insert("x-goog-api-key".to_string(), key.clone());
            }
            GeminiAuth::Bearer(token) => {
                headers.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
        }
        headers.insert("Accept".to_string(), "application/json".to_string());
        for (name, value) in &self.headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, LLMError> {
        let status = response.status;
        let success = response.is_success();
        let retry_after = retry_after_from_headers(&response.headers);
        let text = response.into_string()?;
        if success {
            Ok(text)
        } else {
            tracing::warn!(provider = PROVIDER_NAME, status, body = %text, "vendor returned an error");
            Err(parse_gemini_error(status, &text, retry_after))
        }
    }

    fn try_parse<T: DeserializeOwned>(&self, text: &str) -> Result<T, LLMError> {
        serde_json::from_str(text).map_err(|err| {
            LLMError::provider(
                PROVIDER_NAME,
                format!("failed to parse Gemini response: {err}"),
            )
        })
    }

    fn build_request_body(&self, request: &ProviderRequest) -> Result<Value, LLMError> {
        build_gemini_body(request)
    }
}

fn models_url_for_base(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/v1beta") {
        format!("{base}/models")
    } else {
        format!("{base}/v1beta/models")
    }
}

fn normalize_model(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

#[async_trait]
impl LLMProvider for GoogleGeminiProvider {
    async fn chat(&self, request: ProviderRequest) -> Result<ProviderReply, LLMError> {
        let endpoint = self.endpoint(&request.model);
        let body = self.build_request_body(&request)?;
        let response =
            post_json_with_headers(self.transport.as_ref(), endpoint, self.build_headers(), &body)
                .await?;
        let text = self.ensure_success(response)?;
        let parsed: GeminiGenerateContentResponse = self.try_parse(&text)?;
        map_response(parsed)
    }

    async fn stream_chat(
        &self,
        request: ProviderRequest,
        on_content: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> Result<ProviderReply, LLMError> {
        let endpoint = self.stream_endpoint(&request.model);
        let body = self.build_request_body(&request)?;
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            endpoint,
            self.build_headers(),
            &body,
        )
        .await?;
        if !response.is_success() {
            let status = response.status;
            let retry_after = retry_after_from_headers(&response.headers);
            let text = collect_stream_text(response.body, PROVIDER_NAME).await?;
            tracing::warn!(provider = PROVIDER_NAME, status, body = %text, "vendor returned an error");
            return Err(parse_gemini_error(status, &text, retry_after));
        }
        consume_stream(response.body, on_content).await
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
