//! Query generation with bounded retry.

use tracing::{info, instrument, warn};

use deepresearch_shared::Query;

use crate::context::StageContext;
use serde_json::Value;

use crate::parse::{extract_json_arrays, strip_code_fences};
use crate::prompts;

/// Result of query generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// At least one valid query was produced.
    Generated(Vec<Query>),
    /// Every attempt yielded nothing usable.
    Exhausted { attempts: u32 },
}

impl QueryOutcome {
    /// Queries to search with; empty when exhausted.
    pub fn into_queries(self) -> Vec<Query> {
        match self {
            Self::Generated(queries) => queries,
            Self::Exhausted { .. } => Vec::new(),
        }
    }
}

/// Pull valid queries out of a raw model reply.
///
/// A reply that is itself a JSON array is taken whole. Otherwise every JSON
/// array in the reply counts, so prose around the array or one array per
/// language are both accepted.
pub fn parse_queries(raw: &str) -> Vec<Query> {
    let text = strip_code_fences(raw);
    let values = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(values)) => values,
        _ => extract_json_arrays(&text),
    };
    values
        .into_iter()
        .filter_map(|v| v.as_str().and_then(Query::new))
        .collect()
}

/// Ask the model for search queries, retrying up to `attempts` times.
#[instrument(skip_all, fields(topic = %topic, attempts = attempts))]
pub async fn generate_queries(ctx: &StageContext<'_>, topic: &str, attempts: u32) -> QueryOutcome {
    for attempt in 1..=attempts {
        let raw = ctx.ask(prompts::queries(ctx.language, topic, ctx.year)).await;
        let queries = parse_queries(&raw);

        if !queries.is_empty() {
            info!(attempt, count = queries.len(), "queries generated");
            return QueryOutcome::Generated(queries);
        }
        warn!(attempt, "no valid queries in model reply, retrying");
    }

    warn!(attempts, "query generation exhausted");
    QueryOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use deepresearch_shared::{Language, ResearchError};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn parse_filters_short_and_non_string_items() {
        let raw = "```json\n[\"AI diagnostics 2025\", \"AI\", 42, \"  healthcare AI trends 2024 \"]\n```";
        let queries = parse_queries(raw);
        let texts: Vec<&str> = queries.iter().map(Query::as_str).collect();
        assert_eq!(texts, vec!["AI diagnostics 2025", "healthcare AI trends 2024"]);
    }

    #[test]
    fn parse_merges_multiple_arrays() {
        let raw = "RU: [\"ИИ в медицине 2025\"]\nEN: [\"AI in medicine 2025\"]";
        assert_eq!(parse_queries(raw).len(), 2);
    }

    #[test]
    fn parse_keeps_queries_containing_brackets() {
        let raw = r#"["AI diagnostics [radiology] 2025", "healthcare AI trends 2024"]"#;
        let texts: Vec<String> = parse_queries(raw).iter().map(|q| q.as_str().to_string()).collect();
        assert_eq!(texts, vec!["AI diagnostics [radiology] 2025", "healthcare AI trends 2024"]);

        let prose = format!("Here are the queries: {raw}");
        assert_eq!(parse_queries(&prose).len(), 2);
    }

    #[tokio::test]
    async fn retries_until_valid() {
        let calls = AtomicU32::new(0);
        let model = ScriptedModel::new(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(if n < 2 {
                "Sorry, here you go: [\"too short\"]".to_string()
            } else {
                "[\"AI diagnostics 2025\"]".to_string()
            })
        });
        let ctx = StageContext::new(&model, Language::En, "test-model");

        let outcome = generate_queries(&ctx, "AI in healthcare", 5).await;

        assert_eq!(
            outcome,
            QueryOutcome::Generated(vec![Query::new("AI diagnostics 2025").unwrap()])
        );
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let model = ScriptedModel::new(|_| Err(ResearchError::Llm("down".into())));
        let ctx = StageContext::new(&model, Language::Ru, "test-model");

        let outcome = generate_queries(&ctx, "тема", 5).await;

        assert_eq!(outcome, QueryOutcome::Exhausted { attempts: 5 });
        assert_eq!(model.prompts().len(), 5);
        assert!(outcome.into_queries().is_empty());
    }

    #[tokio::test]
    async fn requests_carry_model_and_system_message() {
        let model = ScriptedModel::new(|_| Ok("[\"one two three\"]".into()));
        let ctx = StageContext::new(&model, Language::En, "gpt-4o-mini");

        generate_queries(&ctx, "topic", 1).await;

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].model.as_deref(), Some("gpt-4o-mini"));
        assert!(requests[0].system[0].contains("professional researcher"));
    }
}
