//! In-memory service fakes for stage and pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use deepresearch_fetcher::{PageFetcher, error_placeholder};
use deepresearch_llm::{CompletionRequest, LanguageModel};
use deepresearch_search::{RawResult, SearchProvider, SearchResponse};
use deepresearch_shared::{ResearchError, Result};

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;

/// Model whose replies are computed from the request.
pub struct ScriptedModel {
    respond: Responder,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(respond: impl Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies by the first marker found in the prompt; everything else gets `fallback`.
    pub fn by_marker(rules: Vec<(&'static str, String)>, fallback: &'static str) -> Self {
        Self::new(move |req| {
            Ok(rules
                .iter()
                .find(|(marker, _)| req.prompt.contains(marker))
                .map(|(_, reply)| reply.clone())
                .unwrap_or_else(|| fallback.to_string()))
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let reply = (self.respond)(&request);
        self.requests.lock().unwrap().push(request);
        reply
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

/// Search provider answering from a fixed table.
#[derive(Default)]
pub struct FakeSearch {
    pub results: HashMap<String, Vec<RawResult>>,
    pub failing: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with(mut self, query: &str, urls: &[&str]) -> Self {
        let results = urls
            .iter()
            .enumerate()
            .map(|(i, url)| RawResult {
                title: Some(format!("{query} #{}", i + 1)),
                link: Some(url.to_string()),
                snippet: Some(format!("snippet for {url}")),
            })
            .collect();
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search_batch(
        &self,
        queries: &[String],
        max_results_per_query: usize,
    ) -> Result<Vec<SearchResponse>> {
        let mut out = Vec::new();
        for q in queries {
            self.calls.lock().unwrap().push(q.clone());
            if self.failing.contains(q) {
                return Err(ResearchError::Search(format!("quota exceeded for {q}")));
            }
            let mut results = self.results.get(q).cloned().unwrap_or_default();
            results.truncate(max_results_per_query);
            out.push(SearchResponse {
                answer: String::new(),
                results,
            });
        }
        Ok(out)
    }
}

/// Fetcher returning canned page text; URLs listed in `unreachable` time out.
#[derive(Default)]
pub struct FakeFetcher {
    pub unreachable: Vec<String>,
}

impl FakeFetcher {
    pub fn unreachable(urls: &[&str]) -> Self {
        Self {
            unreachable: urls.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_text(&self, url: Option<&str>) -> String {
        match url {
            None => String::new(),
            Some(u) if self.unreachable.iter().any(|x| x == u) => {
                error_placeholder(u, "operation timed out")
            }
            Some(u) => format!("Page body of {u}"),
        }
    }
}
