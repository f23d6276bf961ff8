//! Section drafting.

use tracing::{debug, info, instrument};

use deepresearch_shared::{Link, SectionDraft, Summary};

use crate::context::StageContext;
use crate::gate::gated_join;
use crate::outline::Outline;
use crate::prompts;

/// Lower-case fragments marking introduction or conclusion sections, which
/// are never drafted.
pub const STRUCTURAL_KEYWORDS: &[&str] = &[
    "введение",
    "заключение",
    "выводы",
    "резюме",
    "summary",
    "conclusion",
    "introduction",
];

/// Whether a section title names an introduction/conclusion-style section.
pub fn is_structural(title: &str) -> bool {
    let lower = title.to_lowercase();
    STRUCTURAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Material shared by every section prompt: the numbered plan and the sources.
#[derive(Debug, Clone, Default)]
pub struct SectionSources {
    pub plan: String,
    pub links_md: String,
    pub table_md: String,
}

impl SectionSources {
    pub fn new(outline: &Outline, links: &[Link], summaries: &[Summary]) -> Self {
        Self {
            plan: outline.numbered(),
            links_md: prompts::sources_list(links),
            table_md: prompts::summaries_table(summaries),
        }
    }
}

/// Draft one section. `index` is 1-based into `all_titles`.
pub async fn draft_section(
    ctx: &StageContext<'_>,
    topic: &str,
    title: &str,
    index: usize,
    all_titles: &[String],
    sources: &SectionSources,
) -> SectionDraft {
    if is_structural(title) {
        debug!(index, title, "skipping structural section");
        return SectionDraft {
            index,
            title: title.to_string(),
            text: String::new(),
        };
    }

    let others: Vec<&str> = all_titles
        .iter()
        .enumerate()
        .filter(|(i, _)| i + 1 != index)
        .map(|(_, t)| t.as_str())
        .collect();

    let prompt = prompts::section(
        ctx.language,
        topic,
        title,
        &sources.plan,
        &others,
        &sources.links_md,
        &sources.table_md,
        ctx.year,
    );

    SectionDraft {
        index,
        title: title.to_string(),
        text: ctx.ask(prompt).await,
    }
}

/// Draft every outline section concurrently; drafts come back in outline order.
#[instrument(skip_all, fields(sections = outline.len()))]
pub async fn draft_sections(
    ctx: &StageContext<'_>,
    topic: &str,
    outline: &Outline,
    sources: &SectionSources,
) -> Vec<SectionDraft> {
    let drafts = gated_join(
        ctx.concurrency,
        outline.titles.iter().enumerate().map(|(i, title)| {
            draft_section(ctx, topic, title, i + 1, &outline.titles, sources)
        }),
    )
    .await;

    let empty = drafts.iter().filter(|d| d.is_empty()).count();
    info!(drafted = drafts.len() - empty, omitted = empty, "sections drafted");
    drafts
}
