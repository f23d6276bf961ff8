//! Page summarization: fetch and condense every link concurrently.

use tracing::{info, instrument};

use deepresearch_fetcher::{PageFetcher, is_error_placeholder};
use deepresearch_shared::{Link, Summary};

use crate::context::StageContext;
use crate::gate::gated_join;
use crate::prompts;

/// Produce exactly one [`Summary`] per link, in link order.
///
/// A failed fetch still goes through the model; the summary text then starts
/// with the fetch error placeholder so the failure stays visible.
#[instrument(skip_all, fields(links = links.len()))]
pub async fn summarize(
    ctx: &StageContext<'_>,
    fetcher: &dyn PageFetcher,
    topic: &str,
    links: &[Link],
) -> Vec<Summary> {
    let summaries = gated_join(
        ctx.concurrency,
        links.iter().map(|link| summarize_one(ctx, fetcher, topic, link)),
    )
    .await;

    let failed = summaries
        .iter()
        .filter(|s| is_error_placeholder(s.text.lines().next().unwrap_or("")))
        .count();
    info!(summaries = summaries.len(), failed, "pages summarized");
    summaries
}

async fn summarize_one(
    ctx: &StageContext<'_>,
    fetcher: &dyn PageFetcher,
    topic: &str,
    link: &Link,
) -> Summary {
    let page_text = fetcher.fetch_text(link.url.as_deref()).await;
    let condensed = ctx
        .ask(prompts::summarize_page(ctx.language, topic, &page_text, ctx.year))
        .await;

    let text = if is_error_placeholder(&page_text) {
        if condensed.trim().is_empty() {
            page_text
        } else {
            format!("{page_text}\n{}", condensed.trim())
        }
    } else {
        condensed
    };

    Summary {
        url: link.url.clone(),
        title: link.title.clone(),
        text,
    }
}
