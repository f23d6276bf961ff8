//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use deepresearch_core::{ProgressReporter, Researcher, Services};
use deepresearch_fetcher::HttpFetcher;
use deepresearch_llm::OpenAiClient;
use deepresearch_render::{DocumentRenderer, PdfRenderer};
use deepresearch_search::SerperClient;
use deepresearch_shared::{
    AppConfig, Language, PipelineConfig, Report, RunProgress, Stage, init_config, load_config,
    validate_api_keys,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// deepresearch: sourced research reports from a single topic.
#[derive(Parser)]
#[command(
    name = "deepresearch",
    version,
    about = "Generate a structured, source-grounded research report for a topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research a topic and write the report.
    Research {
        /// Free-text research topic.
        topic: String,

        /// Output directory for the report files.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Report language: ru or en.
        #[arg(short, long)]
        language: Option<Language>,

        /// Model id for every completion (overrides config).
        #[arg(short, long)]
        model: Option<String>,

        /// Skip PDF rendering.
        #[arg(long)]
        no_pdf: bool,

        /// Skip saving the markdown copy.
        #[arg(long)]
        no_markdown: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Flags of the `research` command that override config values.
#[derive(Debug, Default)]
pub(crate) struct ResearchOverrides {
    pub out: Option<PathBuf>,
    pub language: Option<Language>,
    pub model: Option<String>,
    pub no_pdf: bool,
    pub no_markdown: bool,
}

impl ResearchOverrides {
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(out) = self.out {
            config.output_dir = out;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if self.no_pdf {
            config.render_document = false;
        }
        if self.no_markdown {
            config.save_markdown = false;
        }
        config
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "deepresearch=info",
        1 => "deepresearch=debug",
        _ => "deepresearch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Research {
            topic,
            out,
            language,
            model,
            no_pdf,
            no_markdown,
        } => {
            let overrides = ResearchOverrides {
                out,
                language,
                model,
                no_pdf,
                no_markdown,
            };
            cmd_research(&topic, overrides).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Wire the HTTP-backed services from config.
fn build_services(config: &AppConfig, render: bool) -> Result<Services> {
    let renderer: Option<Arc<dyn DocumentRenderer>> =
        render.then(|| Arc::new(PdfRenderer::new(&config.render)) as Arc<dyn DocumentRenderer>);

    Ok(Services {
        llm: Arc::new(OpenAiClient::new(&config.llm)?),
        search: Arc::new(SerperClient::new(&config.search)?),
        fetcher: Arc::new(HttpFetcher::new(&config.fetch)?),
        renderer,
    })
}

async fn cmd_research(topic: &str, overrides: ResearchOverrides) -> Result<()> {
    let config = load_config()?;
    validate_api_keys(&config)?;

    if topic.trim().is_empty() {
        return Err(eyre!("research topic must not be empty"));
    }

    let pipeline = overrides.apply(PipelineConfig::from(&config));
    let services = build_services(&config, pipeline.render_document)?;

    info!(
        topic,
        language = %pipeline.language,
        model = %pipeline.model,
        out = %pipeline.output_dir.display(),
        "starting research"
    );

    let start = Instant::now();
    let researcher = Researcher::new(services, pipeline);
    let reporter = CliProgress::new();
    let result = researcher.run(topic, &reporter).await;
    reporter.finish();
    let report = result?;

    println!();
    print!("{}", completion_summary(&report, researcher.config().render_document));
    println!("  Time:      {:.1}s", start.elapsed().as_secs_f64());
    println!();

    if report.markdown_path.is_none() && report.document_path.is_none() {
        println!("{}", report.content);
    }

    Ok(())
}

/// Result lines printed after a run.
fn completion_summary(report: &Report, render_requested: bool) -> String {
    let mut out = String::from("  Research complete!\n");
    out.push_str(&format!("  Sections:  {}\n", report.sections.len()));
    out.push_str(&format!("  Links:     {}\n", report.references.len()));
    out.push_str(&format!("  Summaries: {}\n", report.summaries.len()));
    match &report.document_path {
        Some(path) => out.push_str(&format!("  Document:  {}\n", path.display())),
        None if render_requested => out.push_str("  Document:  not rendered (see log)\n"),
        None => {}
    }
    if let Some(path) = &report.markdown_path {
        out.push_str(&format!("  Markdown:  {}\n", path.display()));
    }
    out
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter driving an indicatif percentage bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_message(progress: &RunProgress) -> String {
    let label = match progress.stage {
        Stage::Init => "Starting",
        Stage::CollectLinks => "Collecting links",
        Stage::Summarize => "Summarizing pages",
        Stage::Outline => "Building outline",
        Stage::Report => "Writing report",
        Stage::Pdf => "Rendering document",
        Stage::Done => "Done",
        Stage::Error => "Failed",
    };
    if progress.detail.is_empty() {
        label.to_string()
    } else {
        format!("{label}: {}", progress.detail)
    }
}

impl ProgressReporter for CliProgress {
    fn report(&self, progress: &RunProgress) {
        self.bar.set_position(u64::from(progress.percent));
        self.bar.set_message(stage_message(progress));
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
