//! Per-run state shared by the stages.

use deepresearch_llm::{CompletionRequest, LanguageModel, complete_or_empty};
use deepresearch_shared::Language;

use crate::prompts;

/// Everything a stage needs to talk to the model.
///
/// The model id is carried here and copied into each request, so
/// concurrently drafting sections never race on a shared setting.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub llm: &'a dyn LanguageModel,
    pub language: Language,
    pub model: &'a str,
    /// Upper bound on in-flight fetches or completions within a stage.
    pub concurrency: usize,
    /// Year used to anchor recency in prompts.
    pub year: i32,
}

impl<'a> StageContext<'a> {
    pub fn new(llm: &'a dyn LanguageModel, language: Language, model: &'a str) -> Self {
        use chrono::Datelike;
        Self {
            llm,
            language,
            model,
            concurrency: 8,
            year: chrono::Local::now().year(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build a request with the research system message and this run's model.
    pub fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .with_system(prompts::system_text(self.language, self.year))
            .with_model(self.model)
    }

    /// Complete `prompt`, returning an empty string on failure.
    pub async fn ask(&self, prompt: String) -> String {
        complete_or_empty(self.llm, self.request(prompt)).await
    }
}
