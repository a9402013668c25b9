//! Command-line interface definitions for Funding Scout.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also be provided via environment variables.

use crate::models::FocusArea;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which text generation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A local Ollama server.
    Ollama,
    /// An OpenAI-compatible API configured through awful_aj's config.yaml.
    AwfulJade,
}

/// Command-line arguments for Funding Scout.
///
/// # Examples
///
/// ```sh
/// # Scrape live news and analyse it with the default Ollama model
/// funding_scout
///
/// # Skip scraping, focus on fintech, with extra context
/// funding_scout --use-sample-data --focus-area fintech --context "B2B, EU market"
///
/// # Analyse your own idea against the latest funding news
/// funding_scout --idea "AI-powered personal finance app for Gen Z users"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Generation backend
    #[arg(long, value_enum, default_value_t = Backend::Ollama)]
    pub backend: Backend,

    /// Ollama model name (llama3.2, llama3.1, llama3, llama2, mistral, phi3, gemma2, ...)
    #[arg(long, env = "FUNDING_SCOUT_MODEL", default_value = "llama3.2")]
    pub model: String,

    /// Ollama server root URL
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Path to awful_aj config.yaml (defaults to awful_aj's config directory)
    #[arg(long)]
    pub awful_config: Option<PathBuf>,

    /// awful_aj chat template name
    #[arg(long, default_value = "simple_question")]
    pub template: String,

    /// Use the built-in sample data instead of scraping
    #[arg(long)]
    pub use_sample_data: bool,

    /// Number of articles to analyse
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(5..=25))]
    pub num_articles: u16,

    /// Sector to focus the generated ideas on
    #[arg(short, long, value_enum, default_value_t = FocusArea::All)]
    pub focus_area: FocusArea,

    /// Free-text context for idea generation (background, markets, constraints)
    #[arg(short, long, default_value = "")]
    pub context: String,

    /// Only run a competitive analysis of this idea
    #[arg(long, value_parser = non_blank)]
    pub idea: Option<String>,

    /// YAML file replacing the built-in news source definitions
    #[arg(long, env = "FUNDING_SCOUT_SOURCES")]
    pub sources: Option<PathBuf>,

    /// Pause between sources, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub source_delay_ms: u64,

    /// Scrape all sources concurrently
    #[arg(long)]
    pub parallel_sources: bool,

    /// Upper bound for a single generation call, in seconds
    #[arg(long, env = "FUNDING_SCOUT_GENERATOR_TIMEOUT", default_value_t = 300)]
    pub generator_timeout_secs: u64,

    /// Retries of a failed generation call
    #[arg(long, default_value_t = 2)]
    pub generator_retries: usize,

    /// Output directory for reports
    #[arg(short, long, default_value = "./reports")]
    pub output_dir: String,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(long)]
    pub debug: bool,
}

/// Reject empty or whitespace-only values; keep the rest trimmed.
fn non_blank(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err("must not be blank".to_string())
    } else {
        Ok(value.to_string())
    }
}
