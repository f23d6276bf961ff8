//! Language-model service boundary.
//!
//! Stages talk to the model through [`LanguageModel`]: a prompt plus optional
//! system messages in, text out. The target model travels with each
//! [`CompletionRequest`] so concurrent callers never share mutable model state.

mod openai;

use async_trait::async_trait;
use tracing::warn;

use deepresearch_shared::Result;

pub use openai::OpenAiClient;

/// A single completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// User prompt.
    pub prompt: String,
    /// System messages, sent before the prompt in order.
    pub system: Vec<String>,
    /// Model override; `None` uses the client's default.
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, message: impl Into<String>) -> Self {
        self.system.push(message.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Text completion service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion. Transport and API failures are returned as errors.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Model used when a request carries no override.
    fn default_model(&self) -> &str;
}

/// Run a completion, logging any failure and returning an empty string instead.
pub async fn complete_or_empty(llm: &dyn LanguageModel, request: CompletionRequest) -> String {
    match llm.complete(request).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "completion failed, continuing with empty response");
            String::new()
        }
    }
}
