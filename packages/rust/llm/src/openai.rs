//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use deepresearch_shared::{LlmConfig, ResearchError, Result};

use crate::{CompletionRequest, LanguageModel};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("deepresearch/", env!("CARGO_PKG_VERSION"));

/// Client for any endpoint that speaks the `/chat/completions` API.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Create a client, reading the API key from `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ResearchError::config(format!(
                    "LLM API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;
        Self::with_key(config, api_key)
    }

    /// Create a client with an explicitly provided API key.
    pub fn with_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.default_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_body(&self, request: &CompletionRequest) -> Value {
        let mut messages: Vec<Value> = request
            .system
            .iter()
            .map(|content| json!({ "role": "system", "content": content }))
            .collect();
        messages.push(json!({ "role": "user", "content": request.prompt }));

        json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    #[instrument(skip_all, fields(model = %request.model.as_deref().unwrap_or(&self.model)))]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        debug!(%url, prompt_len = request.prompt.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResearchError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ResearchError::Llm(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let excerpt: String = text.chars().take(300).collect();
            return Err(ResearchError::Llm(format!("HTTP {status}: {excerpt}")));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| ResearchError::Llm(format!("invalid JSON response: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ResearchError::Llm("response has no message content".into()))
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            base_url: format!("{}/v1", server.uri()),
            ..LlmConfig::default()
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn body_orders_system_before_user() {
        let client = OpenAiClient::with_key(&LlmConfig::default(), "k").unwrap();
        let body = client.build_body(
            &CompletionRequest::new("question").with_system("persona"),
        );
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "persona");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 4096);
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hello there")))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_key(&config_for(&server), "test-key").unwrap();
        let text = client.complete(CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(text, "hello there");
    }

    #[tokio::test]
    async fn per_request_model_overrides_default() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-4o" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("override")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::with_key(&config_for(&server), "k").unwrap();
        let text = client
            .complete(CompletionRequest::new("hi").with_model("gpt-4o"))
            .await
            .unwrap();
        assert_eq!(text, "override");
        assert_eq!(client.default_model(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn http_error_maps_to_llm_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_key(&config_for(&server), "k").unwrap();
        let err = client.complete(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ResearchError::Llm(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn missing_content_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_key(&config_for(&server), "k").unwrap();
        assert!(client.complete(CompletionRequest::new("hi")).await.is_err());
    }

    #[test]
    fn missing_key_env_is_config_error() {
        let config = LlmConfig {
            api_key_env: "DR_TEST_MISSING_LLM_KEY_98765".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiClient::new(&config),
            Err(ResearchError::Config { .. })
        ));
    }
}
