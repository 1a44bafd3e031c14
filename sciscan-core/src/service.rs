//! Hosted model boundary.
//!
//! `AnalysisService` is the seam between the analysis client and the external
//! model. `GeminiService` talks to the native Google Gemini API:
//! - Auth via `?key=API_KEY` query parameter
//! - System instruction is a top-level `system_instruction` field
//! - Binary documents travel as `inline_data` parts
//! - Web retrieval is enabled with the `google_search` tool
//!
//! `MockAnalysisService` replays canned results and records every request.

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::request::{AnalysisRequest, RequestPart};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// What came back from one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceResponse {
    /// Concatenated text output; may be empty.
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}

impl ServiceResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// A hosted model able to answer an `AnalysisRequest`.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Send the request and return the raw text answer.
    async fn generate(&self, request: &AnalysisRequest) -> Result<ServiceResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Google Gemini `generateContent` client.
pub struct GeminiService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: Option<u64>,
}

impl GeminiService {
    /// Create a new Gemini service from configuration.
    ///
    /// Uses `config.api_key` when set, otherwise reads the environment variable
    /// named by `config.api_key_env`. Returns `LlmError::AuthFailed` if neither is set.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty()))
            .ok_or_else(|| LlmError::AuthFailed {
                provider: format!("Gemini (env var '{}' not set)", config.api_key_env),
            })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new Gemini service with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut builder =
            Client::builder().connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build the JSON request body for the Gemini API.
    fn build_request_body(request: &AnalysisRequest) -> Value {
        let parts: Vec<Value> = request.parts.iter().map(Self::part_to_json).collect();

        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "system_instruction": {
                "parts": [{"text": request.system_instruction}]
            },
            "generationConfig": {
                "temperature": request.temperature,
            },
        });

        if request.enable_search {
            body["tools"] = serde_json::json!([{ "google_search": {} }]);
        }

        body
    }

    fn part_to_json(part: &RequestPart) -> Value {
        match part {
            RequestPart::InlineData { mime_type, data } => serde_json::json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": data,
                }
            }),
            RequestPart::Text { text } => serde_json::json!({ "text": text }),
        }
    }

    /// Parse a Gemini API response JSON into a `ServiceResponse`.
    ///
    /// A response without candidates or text parts yields empty text rather
    /// than an error; the caller decides what an empty answer means.
    fn parse_response(body: &Value) -> ServiceResponse {
        let candidate = body["candidates"].as_array().and_then(|c| c.first());

        let text = candidate
            .and_then(|c| c["content"]["parts"].as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .unwrap_or_default();

        let finish_reason = candidate
            .and_then(|c| c["finishReason"].as_str())
            .map(|s| s.to_string());

        let usage_metadata = &body["usageMetadata"];
        let usage = TokenUsage {
            input_tokens: usage_metadata["promptTokenCount"].as_u64().unwrap_or(0) as usize,
            output_tokens: usage_metadata["candidatesTokenCount"].as_u64().unwrap_or(0) as usize,
        };

        let model = body["modelVersion"]
            .as_str()
            .unwrap_or("gemini")
            .to_string();

        ServiceResponse {
            text,
            model,
            finish_reason,
            usage,
        }
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str, model: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Gemini".to_string(),
            },
            429 => LlmError::RateLimited {
                retry_after_secs: 30,
            },
            404 => LlmError::UnsupportedModel {
                model: model.to_string(),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
        }
    }

    /// The request URL is stripped from `err` so nothing about the endpoint
    /// or credentials reaches logs.
    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        let err = err.without_url();
        if err.is_timeout() {
            LlmError::Timeout {
                timeout_secs: self.timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            }
        } else if err.is_connect() {
            LlmError::Connection {
                message: err.to_string(),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request to Gemini API failed: {}", err),
            }
        }
    }

    /// The key travels in a header, never in the URL.
    fn http_request(&self, url: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("content-type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
    }

    /// Build the endpoint URL for a Gemini API call.
    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl AnalysisService for GeminiService {
    async fn generate(&self, request: &AnalysisRequest) -> Result<ServiceResponse, LlmError> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        let body = Self::build_request_body(request);
        let url = self.endpoint_url(model);

        debug!(
            model,
            search = request.enable_search,
            inline = request.has_inline_data(),
            "Sending Gemini analysis request"
        );

        let response = self
            .http_request(&url, &body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseParse {
                message: format!("Failed to read response body: {}", e.without_url()),
            })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text, model));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        let parsed = Self::parse_response(&response_json);
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            finish_reason = parsed.finish_reason.as_deref().unwrap_or("none"),
            "Gemini response received"
        );
        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// A scripted service for tests: returns queued results in order and records
/// every request it receives.
pub struct MockAnalysisService {
    responses: Mutex<Vec<Result<ServiceResponse, LlmError>>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl MockAnalysisService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_text(&self, text: &str) {
        self.queue_result(Ok(ServiceResponse::text(text)));
    }

    pub fn queue_error(&self, err: LlmError) {
        self.queue_result(Err(err));
    }

    pub fn queue_result(&self, result: Result<ServiceResponse, LlmError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result);
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl Default for MockAnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    async fn generate(&self, request: &AnalysisRequest) -> Result<ServiceResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        if responses.is_empty() {
            Ok(ServiceResponse::default())
        } else {
            responses.remove(0)
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{Attachment, PDF_MIME_TYPE};
    use crate::config::AnalysisConfig;
    use crate::error::AnalysisError;
    use crate::request::build_request;

    fn test_config(api_key_env: &str) -> LlmConfig {
        LlmConfig {
            api_key_env: api_key_env.to_string(),
            ..LlmConfig::default()
        }
    }

    fn link_request() -> AnalysisRequest {
        build_request(
            "https://doi.org/10.1000/example",
            None,
            &AnalysisConfig::default(),
            "gemini-3-pro-preview",
            0.2,
        )
        .unwrap()
    }

    #[test]
    fn test_new_reads_env() {
        let env_var = "SCISCAN_TEST_GEMINI_KEY_NEW_READS";
        // SAFETY: test-only env var manipulation
        unsafe { std::env::set_var(env_var, "my-gemini-api-key") };
        let service = GeminiService::new(&test_config(env_var)).unwrap();
        assert_eq!(service.api_key, "my-gemini-api-key");
        assert_eq!(service.model, "gemini-3-pro-preview");
        assert_eq!(service.base_url, DEFAULT_BASE_URL);
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var(env_var) };
    }

    #[test]
    fn test_inline_key_wins() {
        let mut config = test_config("SCISCAN_TEST_GEMINI_UNUSED");
        config.api_key = Some("inline-key".into());
        let service = GeminiService::new(&config).unwrap();
        assert_eq!(service.api_key, "inline-key");
    }

    #[test]
    fn test_new_missing_env_returns_auth_failed() {
        let config = test_config("SCISCAN_TEST_GEMINI_MISSING_XYZ");
        match GeminiService::new(&config) {
            Err(LlmError::AuthFailed { provider }) => {
                assert!(provider.contains("SCISCAN_TEST_GEMINI_MISSING_XYZ"));
            }
            Err(other) => panic!("Expected AuthFailed, got {:?}", other),
            Ok(_) => panic!("Expected AuthFailed, got a service"),
        }
    }

    #[test]
    fn test_endpoint_url() {
        let mut config = test_config("UNUSED");
        config.base_url = Some("https://proxy.example.com/v1".into());
        let service = GeminiService::new_with_key(&config, "k".into()).unwrap();
        assert_eq!(
            service.endpoint_url("gemini-3-pro-preview"),
            "https://proxy.example.com/v1/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[test]
    fn test_api_key_is_sent_as_header() {
        let service = GeminiService::new_with_key(&test_config("UNUSED"), "k-123".into()).unwrap();
        let url = service.endpoint_url("gemini-3-pro-preview");
        let request = service
            .http_request(&url, &serde_json::json!({}))
            .build()
            .unwrap();
        assert_eq!(request.headers()[API_KEY_HEADER], "k-123");
        assert!(request.url().query().is_none());
    }

    #[tokio::test]
    async fn test_send_failure_does_not_expose_api_key() {
        let mut config = test_config("UNUSED");
        config.base_url = Some("http://127.0.0.1:1/v1beta".into());
        config.timeout_secs = Some(5);
        let service = GeminiService::new_with_key(&config, "SECRETKEY123".into()).unwrap();

        let err = service.generate(&link_request()).await.unwrap_err();
        assert!(!err.to_string().contains("SECRETKEY123"));
        assert!(!format!("{:?}", err).contains("SECRETKEY123"));
        let wrapped = AnalysisError::Transport(err);
        assert!(!wrapped.to_string().contains("SECRETKEY123"));
    }

    #[test]
    fn test_build_request_body_with_search() {
        let body = GeminiService::build_request_body(&link_request());
        assert_eq!(body["tools"][0]["google_search"], serde_json::json!({}));
        assert_eq!(body["contents"][0]["role"], "user");
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("https://doi.org/10.1000/example"));
        assert!(
            body["system_instruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("senior scientist")
        );
        let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_build_request_body_with_pdf_has_no_tools() {
        let pdf = Attachment::new("a.pdf", PDF_MIME_TYPE, b"%PDF".to_vec());
        let req = build_request("", Some(&pdf), &AnalysisConfig::default(), "m", 0.2).unwrap();
        let body = GeminiService::build_request_body(&req);
        assert!(body.get("tools").is_none());
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inline_data"]["mime_type"], PDF_MIME_TYPE);
        assert_eq!(parts[0]["inline_data"]["data"], "JVBERg==");
        assert!(parts[1]["text"].is_string());
    }

    #[test]
    fn test_parse_text_response_concatenates_parts() {
        let response_json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "{\"title\":"}, {"text": "\"X\"}"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 25,
                "candidatesTokenCount": 10
            },
            "modelVersion": "gemini-3-pro-preview"
        });

        let result = GeminiService::parse_response(&response_json);
        assert_eq!(result.text, "{\"title\":\"X\"}");
        assert_eq!(result.model, "gemini-3-pro-preview");
        assert_eq!(result.usage.input_tokens, 25);
        assert_eq!(result.usage.output_tokens, 10);
        assert_eq!(result.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_parse_response_without_candidates_is_empty() {
        let result = GeminiService::parse_response(&serde_json::json!({"promptFeedback": {}}));
        assert!(result.text.is_empty());
        assert_eq!(result.model, "gemini");
    }

    #[test]
    fn test_http_error_mapping() {
        let err = GeminiService::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "bad key", "m");
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err = GeminiService::map_http_error(reqwest::StatusCode::FORBIDDEN, "forbidden", "m");
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let err = GeminiService::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow", "m");
        assert!(matches!(err, LlmError::RateLimited { retry_after_secs: 30 }));

        match GeminiService::map_http_error(reqwest::StatusCode::NOT_FOUND, "", "gemini-9") {
            LlmError::UnsupportedModel { model } => assert_eq!(model, "gemini-9"),
            other => panic!("Expected UnsupportedModel, got {:?}", other),
        }

        match GeminiService::map_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom", "m") {
            LlmError::ApiRequest { message } => assert!(message.contains("500")),
            other => panic!("Expected ApiRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_and_records() {
        let mock = MockAnalysisService::new();
        mock.queue_text("first");
        mock.queue_error(LlmError::Timeout { timeout_secs: 5 });

        let req = link_request();
        assert_eq!(mock.generate(&req).await.unwrap().text, "first");
        assert!(matches!(
            mock.generate(&req).await,
            Err(LlmError::Timeout { timeout_secs: 5 })
        ));
        assert_eq!(mock.generate(&req).await.unwrap().text, "");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.last_request(), Some(req));
    }
}
