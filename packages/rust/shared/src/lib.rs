//! Shared types, error model, and configuration for deepresearch.
//!
//! This crate is the foundation depended on by all other deepresearch crates.
//! It provides:
//! - [`ResearchError`], the unified error type
//! - Domain types ([`Link`], [`Summary`], [`SectionDraft`], [`Report`], [`RunProgress`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)
//! - [`safe_filename`] for deriving artifact names from a topic

pub mod config;
pub mod error;
pub mod slug;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, LlmConfig, PipelineConfig, PipelineSettings,
    RenderConfig, SearchConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_api_keys,
};
pub use error::{ResearchError, Result};
pub use slug::{MAX_SLUG_LEN, safe_filename};
pub use types::{
    Language, Link, Query, Report, RunId, RunProgress, SectionDraft, Stage, Summary,
};
