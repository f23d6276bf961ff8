//! End-to-end research run: topic → links → summaries → outline → sections →
//! report → document.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Span, info, instrument, warn};

use deepresearch_fetcher::PageFetcher;
use deepresearch_llm::LanguageModel;
use deepresearch_render::{DocumentRenderer, write_document, write_markdown};
use deepresearch_search::SearchProvider;
use deepresearch_shared::{Language, PipelineConfig, Report, ResearchError, Result, Stage};

use crate::assembler::assemble;
use crate::context::StageContext;
use crate::draft::{SectionSources, draft_sections};
use crate::links::{LinkOptions, collect_links};
use crate::outline::{Outline, generate_outline};
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::prompts;
use crate::summarize::summarize;

/// External services a run talks to.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LanguageModel>,
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    /// `None` disables document rendering regardless of config.
    pub renderer: Option<Arc<dyn DocumentRenderer>>,
}

/// Human-readable milestone details.
struct Details {
    drafting: &'static str,
    assembling: &'static str,
    rendering: &'static str,
}

fn details(language: Language) -> Details {
    match language {
        Language::Ru => Details {
            drafting: "начало генерации разделов",
            assembling: "объединение разделов",
            rendering: "создание PDF документа",
        },
        Language::En => Details {
            drafting: "starting section drafting",
            assembling: "assembling sections",
            rendering: "rendering document",
        },
    }
}

fn drafting_detail(language: Language, sections: usize) -> String {
    match language {
        Language::Ru => format!("генерация {sections} разделов параллельно"),
        Language::En => format!("drafting {sections} sections concurrently"),
    }
}

/// Runs the research pipeline.
pub struct Researcher {
    services: Services,
    config: PipelineConfig,
}

impl Researcher {
    pub fn new(services: Services, config: PipelineConfig) -> Self {
        Self { services, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for `topic`.
    ///
    /// Milestones go to `progress`; on failure an `error` milestone carrying
    /// the message is reported before the error is returned.
    #[instrument(skip_all, fields(topic = %topic, model = %self.config.model))]
    pub async fn run(&self, topic: &str, progress: &dyn ProgressReporter) -> Result<Report> {
        let tracker = ProgressTracker::new(progress);
        match self.run_stages(topic, &tracker).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(error = %e, "research run failed");
                tracker.error(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_stages(&self, topic: &str, tracker: &ProgressTracker<'_>) -> Result<Report> {
        let start = Instant::now();
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ResearchError::validation("research topic is empty"));
        }

        let config = &self.config;
        let language = config.language;
        let text = details(language);
        let ctx = StageContext::new(self.services.llm.as_ref(), language, &config.model)
            .with_concurrency(config.concurrency);

        info!("starting research run");

        // --- Links ---
        tracker.milestone(0, Stage::CollectLinks, "");
        let link_options = LinkOptions {
            query_attempts: config.query_attempts,
            max_results_per_query: config.max_results_per_query,
            pacing: Duration::from_millis(config.search_pacing_ms),
            abort_on_search_error: config.abort_on_search_error,
        };
        let links = collect_links(&ctx, self.services.search.as_ref(), topic, &link_options).await?;

        // --- Summaries ---
        tracker.milestone(10, Stage::Summarize, "");
        let summaries = summarize(&ctx, self.services.fetcher.as_ref(), topic, &links).await;

        // --- Outline ---
        tracker.milestone(30, Stage::Outline, "");
        let outline = if summaries.is_empty() {
            info!("no source material, skipping outline");
            Outline { titles: Vec::new() }
        } else {
            generate_outline(&ctx, topic, &summaries, config.max_sections).await
        };

        // --- Sections ---
        tracker.milestone(40, Stage::Report, text.drafting);
        tracker.milestone(45, Stage::Report, drafting_detail(language, outline.len()));
        let sources = SectionSources::new(&outline, &links, &summaries);
        let drafts = draft_sections(&ctx, topic, &outline, &sources).await;

        tracker.milestone(90, Stage::Report, text.assembling);
        let content = assemble(language, topic, &drafts);

        // --- Artifacts ---
        tracker.milestone(95, Stage::Pdf, text.rendering);
        let title = prompts::report_title(language, topic)
            .trim_start_matches('#')
            .trim()
            .to_string();
        let (markdown_path, document_path) = self.write_artifacts(topic, &title, &content).await;

        let sections: Vec<String> = drafts
            .iter()
            .filter(|d| !d.is_empty())
            .map(|d| d.title.clone())
            .collect();

        tracker.milestone(100, Stage::Done, "");
        info!(
            links = links.len(),
            summaries = summaries.len(),
            sections = sections.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "research run completed"
        );

        Ok(Report {
            content,
            sections,
            references: links,
            summaries,
            document_path,
            markdown_path,
        })
    }

    /// Save the markdown copy and render the document on the blocking pool.
    ///
    /// Each artifact fails independently: a failure is logged and yields
    /// `None` for that path, the text report is unaffected.
    async fn write_artifacts(
        &self,
        topic: &str,
        title: &str,
        content: &str,
    ) -> (Option<PathBuf>, Option<PathBuf>) {
        let save_markdown = self.config.save_markdown;
        let renderer = self
            .services
            .renderer
            .clone()
            .filter(|_| self.config.render_document);
        if !save_markdown && renderer.is_none() {
            return (None, None);
        }

        let output_dir = self.config.output_dir.clone();
        let topic = topic.to_string();
        let title = title.to_string();
        let content = content.to_string();
        let span = Span::current();

        let task = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();

            let markdown_path = if save_markdown {
                write_markdown(&output_dir, &topic, &content)
                    .inspect_err(|e| warn!(error = %e, "failed to save markdown report"))
                    .ok()
            } else {
                None
            };

            let document_path = renderer.and_then(|renderer| {
                renderer
                    .render(&title, &content)
                    .and_then(|bytes| write_document(&output_dir, &topic, renderer.extension(), &bytes))
                    .inspect_err(|e| warn!(error = %e, "document rendering failed, returning text report only"))
                    .ok()
            });

            (markdown_path, document_path)
        });

        task.await.unwrap_or_else(|e| {
            warn!(error = %e, "artifact task failed");
            (None, None)
        })
    }
}
