//! Serper-compatible search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use deepresearch_shared::{ResearchError, Result, SearchConfig};

use crate::{RawResult, SearchProvider, SearchResponse};

/// Answer used when the response carries nothing quotable.
pub const NO_ANSWER: &str = "No good search result found";

/// Timeout for a search request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Search client posting JSON query batches with an `X-API-KEY` header.
pub struct SerperClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SerperClient {
    /// Create a client, reading the API key from `config.api_key_env`.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ResearchError::config(format!(
                    "search API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;
        Self::with_key(config, api_key)
    }

    /// Create a client with an explicitly provided API key.
    pub fn with_key(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("deepresearch/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
        })
    }
}

/// One payload entry per query.
fn build_payloads(queries: &[String], max_results: usize) -> Value {
    Value::Array(
        queries
            .iter()
            .map(|q| json!({ "q": q, "num": max_results, "page": 1 }))
            .collect(),
    )
}

#[async_trait]
impl SearchProvider for SerperClient {
    #[instrument(skip_all, fields(queries = queries.len(), max_results = max_results_per_query))]
    async fn search_batch(
        &self,
        queries: &[String],
        max_results_per_query: usize,
    ) -> Result<Vec<SearchResponse>> {
        let payloads = build_payloads(queries, max_results_per_query);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&payloads)
            .send()
            .await
            .map_err(|e| ResearchError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::Search(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ResearchError::Search(format!("unreadable response: {e}")))?;

        let raw_responses = match body {
            Value::Array(items) => items,
            single => vec![single],
        };

        let mut out = Vec::with_capacity(raw_responses.len());
        for raw in &raw_responses {
            let mut processed = process_response(raw)?;
            processed.results.truncate(max_results_per_query);
            out.push(processed);
        }

        debug!(responses = out.len(), "search batch complete");
        Ok(out)
    }
}

/// Look up the first key present, accepting both snake_case and camelCase spellings.
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| value.get(*n))
}

fn focused(entry: &Value) -> RawResult {
    let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);
    RawResult {
        title: text("title"),
        link: text("link"),
        snippet: text("snippet"),
    }
}

/// Turn one provider response object into a direct answer plus ranked results.
pub fn process_response(res: &Value) -> Result<SearchResponse> {
    if let Some(err) = res.get("error") {
        return Err(ResearchError::Search(format!("provider error: {err}")));
    }

    let answer_box = field(res, &["answer_box", "answerBox"]);
    let knowledge_graph = field(res, &["knowledge_graph", "knowledgeGraph"]);
    let sports = field(res, &["sports_results", "sportsResults"]);
    let organic = res.get("organic").and_then(Value::as_array);

    let as_text = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let answer = answer_box
        .and_then(|ab| ab.get("answer"))
        .or_else(|| answer_box.and_then(|ab| ab.get("snippet")))
        .or_else(|| {
            answer_box
                .and_then(|ab| field(ab, &["snippet_highlighted_words", "snippetHighlighted"]))
                .and_then(|w| w.get(0))
        })
        .or_else(|| sports.and_then(|s| field(s, &["game_spotlight", "gameSpotlight"])))
        .or_else(|| knowledge_graph.and_then(|kg| kg.get("description")))
        .or_else(|| organic.and_then(|o| o.first()).and_then(|r| r.get("snippet")))
        .map(as_text)
        .unwrap_or_else(|| NO_ANSWER.to_string());

    let mut results = Vec::new();
    if let Some(ab) = answer_box.filter(|ab| ab.get("snippet").is_some()) {
        results.push(focused(ab));
    }
    if let Some(items) = organic {
        results.extend(items.iter().map(focused));
    }

    Ok(SearchResponse { answer, results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn organic(n: usize) -> Value {
        Value::Array(
            (1..=n)
                .map(|i| {
                    json!({
                        "title": format!("Result {i}"),
                        "link": format!("https://example.com/{i}"),
                        "snippet": format!("Snippet {i}"),
                        "position": i,
                    })
                })
                .collect(),
        )
    }

    #[test]
    fn answer_box_answer_takes_precedence() {
        let res = json!({
            "answer_box": { "answer": "42", "snippet": "the answer" },
            "knowledge_graph": { "description": "kg" },
            "organic": organic(2),
        });
        let out = process_response(&res).unwrap();
        assert_eq!(out.answer, "42");
        // answer box with a snippet is surfaced first, then organic results
        assert_eq!(out.results.len(), 3);
        assert_eq!(out.results[1].title.as_deref(), Some("Result 1"));
    }

    #[test]
    fn knowledge_graph_used_without_answer_box() {
        let res = json!({
            "knowledgeGraph": { "description": "A programming language" },
            "organic": organic(1),
        });
        let out = process_response(&res).unwrap();
        assert_eq!(out.answer, "A programming language");
        assert_eq!(out.results.len(), 1);
    }

    #[test]
    fn falls_back_to_first_organic_snippet_then_default() {
        let out = process_response(&json!({ "organic": organic(3) })).unwrap();
        assert_eq!(out.answer, "Snippet 1");

        let out = process_response(&json!({})).unwrap();
        assert_eq!(out.answer, NO_ANSWER);
        assert!(out.results.is_empty());
    }

    #[test]
    fn error_key_is_an_error() {
        let err = process_response(&json!({ "error": "Invalid API key" })).unwrap_err();
        assert!(matches!(err, ResearchError::Search(_)));
    }

    #[test]
    fn missing_link_is_kept_as_none() {
        let res = json!({ "organic": [{ "title": "No link here", "snippet": "s" }] });
        let out = process_response(&res).unwrap();
        assert!(out.results[0].link.is_none());
    }

    #[test]
    fn payloads_carry_query_and_count() {
        let payloads = build_payloads(&["rust async runtime".into()], 5);
        assert_eq!(payloads[0]["q"], "rust async runtime");
        assert_eq!(payloads[0]["num"], 5);
    }

    #[tokio::test]
    async fn search_posts_with_api_key_and_truncates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("x-api-key", "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "organic": organic(8) }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = SearchConfig {
            endpoint: format!("{}/search", server.uri()),
            ..SearchConfig::default()
        };
        let client = SerperClient::with_key(&config, "secret").unwrap();
        let response = client.search("AI diagnostics 2025", 5).await.unwrap();

        assert_eq!(response.results.len(), 5);
        assert_eq!(response.results[0].link.as_deref(), Some("https://example.com/1"));
    }

    #[tokio::test]
    async fn http_failure_is_search_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let config = SearchConfig {
            endpoint: format!("{}/search", server.uri()),
            ..SearchConfig::default()
        };
        let client = SerperClient::with_key(&config, "bad").unwrap();
        let err = client.search("some search query", 5).await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
