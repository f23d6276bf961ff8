//! Web search provider boundary.
//!
//! [`SearchProvider`] takes queries and returns ranked results per query.
//! [`SerperClient`] implements it against a Serper-compatible endpoint.

mod serper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use deepresearch_shared::{Link, Result};

pub use serper::{NO_ANSWER, SerperClient, process_response};

/// One ranked search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl From<RawResult> for Link {
    fn from(raw: RawResult) -> Self {
        Link {
            url: raw.link,
            title: raw.title,
            snippet: raw.snippet,
        }
    }
}

/// Results for a single query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    /// Consolidated direct answer (answer box, knowledge graph, or top snippet).
    pub answer: String,
    /// Structured results in provider ranking order.
    pub results: Vec<RawResult>,
}

/// Ranked web search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run every query in one request; one response per query, in order.
    async fn search_batch(
        &self,
        queries: &[String],
        max_results_per_query: usize,
    ) -> Result<Vec<SearchResponse>>;

    /// Run a single query.
    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResponse> {
        let mut responses = self.search_batch(&[query.to_string()], max_results).await?;
        Ok(if responses.is_empty() {
            SearchResponse::default()
        } else {
            responses.swap_remove(0)
        })
    }
}
