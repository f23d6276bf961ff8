//! Application configuration for deepresearch.
//!
//! User config lives at `~/.deepresearch/deepresearch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};
use crate::types::Language;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "deepresearch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".deepresearch";

// ---------------------------------------------------------------------------
// Config structs (matching deepresearch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Language-model service.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search provider.
    #[serde(default)]
    pub search: SearchConfig,

    /// Page fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Stage tuning.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Document rendering.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory the rendered document and markdown copy are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Report language.
    #[serde(default)]
    pub language: Language,

    /// Also write the markdown body next to the document.
    #[serde(default = "default_true")]
    pub save_markdown: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            language: Language::default(),
            save_markdown: true,
        }
    }
}

fn default_output_dir() -> String {
    "research_reports".into()
}
fn default_true() -> bool {
    true
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// Model used for every stage unless overridden.
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_llm_key_env(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_llm_timeout() -> u64 {
    180
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Serper-compatible search endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Results requested per query.
    #[serde(default = "default_max_results")]
    pub max_results_per_query: usize,

    /// Delay before each search request, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_key_env(),
            max_results_per_query: default_max_results(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_max_results() -> usize {
    5
}
fn default_pacing_ms() -> u64 {
    2000
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-page request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Extracted text is cut to this many characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Permit loopback/private hosts (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_chars: default_max_chars(),
            allow_private_hosts: false,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_max_chars() -> usize {
    32_000
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Query generation attempts before giving up.
    #[serde(default = "default_query_attempts")]
    pub query_attempts: u32,

    /// Upper bound on outline sections requested from the model.
    #[serde(default = "default_max_sections")]
    pub max_sections: usize,

    /// Concurrent in-flight units during summarize and draft fan-outs.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Abort link collection on the first failing search query instead of skipping it.
    #[serde(default)]
    pub abort_on_search_error: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            query_attempts: default_query_attempts(),
            max_sections: default_max_sections(),
            concurrency: default_concurrency(),
            abort_on_search_error: false,
        }
    }
}

fn default_query_attempts() -> u32 {
    5
}
fn default_max_sections() -> usize {
    6
}
fn default_concurrency() -> usize {
    8
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Produce a PDF document.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding the TTF font family files.
    #[serde(default = "default_font_dir")]
    pub font_dir: String,

    /// Font family name (`<name>-Regular.ttf`, `-Bold`, `-Italic`, `-BoldItalic`).
    #[serde(default = "default_font_name")]
    pub font_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_dir: default_font_dir(),
            font_name: default_font_name(),
        }
    }
}

fn default_font_dir() -> String {
    "/usr/share/fonts/truetype/liberation".into()
}
fn default_font_name() -> String {
    "LiberationSans".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub language: Language,
    /// Model id passed with every completion request.
    pub model: String,
    pub query_attempts: u32,
    pub max_results_per_query: usize,
    /// Delay before each search request, in milliseconds.
    pub search_pacing_ms: u64,
    pub abort_on_search_error: bool,
    pub max_sections: usize,
    pub concurrency: usize,
    pub output_dir: PathBuf,
    pub save_markdown: bool,
    pub render_document: bool,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            language: config.defaults.language,
            model: config.llm.default_model.clone(),
            query_attempts: config.pipeline.query_attempts,
            max_results_per_query: config.search.max_results_per_query,
            search_pacing_ms: config.search.pacing_ms,
            abort_on_search_error: config.pipeline.abort_on_search_error,
            max_sections: config.pipeline.max_sections,
            concurrency: config.pipeline.concurrency,
            output_dir: PathBuf::from(&config.defaults.output_dir),
            save_markdown: config.defaults.save_markdown,
            render_document: config.render.enabled,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.deepresearch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ResearchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.deepresearch/deepresearch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ResearchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ResearchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ResearchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ResearchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ResearchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the LLM and search API key env vars are set and non-empty.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    for (service, var_name) in [
        ("LLM", &config.llm.api_key_env),
        ("search", &config.search.api_key_env),
    ] {
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => {}
            _ => {
                return Err(ResearchError::config(format!(
                    "{service} API key not found. Set the {var_name} environment variable."
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("SERPER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.query_attempts, 5);
        assert_eq!(parsed.fetch.max_chars, 32_000);
        assert_eq!(parsed.defaults.language, Language::Ru);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[defaults]
language = "en"

[search]
max_results_per_query = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.language, Language::En);
        assert_eq!(config.defaults.output_dir, "research_reports");
        assert_eq!(config.search.max_results_per_query, 3);
        assert_eq!(config.search.pacing_ms, 2000);
        assert_eq!(config.llm.default_model, "gpt-4o-mini");
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.max_results_per_query, 5);
        assert_eq!(pipeline.search_pacing_ms, 2000);
        assert_eq!(pipeline.max_sections, 6);
        assert_eq!(pipeline.concurrency, 8);
        assert!(!pipeline.abort_on_search_error);
        assert_eq!(pipeline.output_dir, PathBuf::from("research_reports"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepresearch.toml");
        std::fs::write(&path, "[llm]\ndefault_model = \"gpt-4o\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.llm.default_model, "gpt-4o");
    }

    #[test]
    fn invalid_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepresearch.toml");
        std::fs::write(&path, "[llm\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ResearchError::Config { .. }));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "DR_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_keys(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
