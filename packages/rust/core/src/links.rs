//! Link collection: generated queries run through the search provider one at a time.

use std::time::Duration;

use tracing::{info, instrument, warn};

use deepresearch_search::SearchProvider;
use deepresearch_shared::{Link, Query, Result};

use crate::context::StageContext;
use crate::queries::{QueryOutcome, generate_queries};

/// Search behaviour for one run.
#[derive(Debug, Clone)]
pub struct LinkOptions {
    pub query_attempts: u32,
    pub max_results_per_query: usize,
    /// Delay before every search request.
    pub pacing: Duration,
    /// Fail the run on the first provider error instead of skipping the query.
    pub abort_on_search_error: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            query_attempts: 5,
            max_results_per_query: 5,
            pacing: Duration::from_secs(2),
            abort_on_search_error: false,
        }
    }
}

/// Generate queries for `topic` and collect links for them.
///
/// Returns an empty list without searching when query generation is exhausted.
#[instrument(skip_all, fields(topic = %topic))]
pub async fn collect_links(
    ctx: &StageContext<'_>,
    search: &dyn SearchProvider,
    topic: &str,
    options: &LinkOptions,
) -> Result<Vec<Link>> {
    let queries = match generate_queries(ctx, topic, options.query_attempts).await {
        QueryOutcome::Generated(queries) => queries,
        QueryOutcome::Exhausted { .. } => return Ok(Vec::new()),
    };
    search_queries(search, &queries, options).await
}

/// Run each query sequentially, pacing requests, and flatten results in
/// query-then-rank order.
pub async fn search_queries(
    search: &dyn SearchProvider,
    queries: &[Query],
    options: &LinkOptions,
) -> Result<Vec<Link>> {
    let mut links = Vec::new();
    let mut failed = 0usize;

    for query in queries {
        if !options.pacing.is_zero() {
            tokio::time::sleep(options.pacing).await;
        }

        info!(query = %query, "searching");
        match search
            .search(query.as_str(), options.max_results_per_query)
            .await
        {
            Ok(response) => links.extend(response.results.into_iter().map(Link::from)),
            Err(e) if options.abort_on_search_error => return Err(e),
            Err(e) => {
                failed += 1;
                warn!(query = %query, error = %e, "search failed, skipping query");
            }
        }
    }

    info!(links = links.len(), queries = queries.len(), failed, "links collected");
    Ok(links)
}
