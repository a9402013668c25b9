//! # Funding Scout
//!
//! Scrapes recent startup funding news from TechCrunch and VentureBeat and runs
//! it through a three-stage LLM analysis: market trends, startup ideas for a
//! chosen sector, and a competitive analysis of the first idea.
//!
//! ## Features
//!
//! - Escalating scrape per source: candidate URLs tried in order, selector
//!   strategies tried in order, stop at the first page that yields articles
//! - Built-in sample articles when scraping yields nothing (or on request)
//! - Ollama or any OpenAI-compatible endpoint (via awful_aj) as the generator,
//!   wrapped in a timeout and exponential backoff
//! - JSON and Markdown reports plus a plain text export of the ideas
//!
//! ## Usage
//!
//! ```sh
//! funding_scout --focus-area fintech --context "EU market, B2B"
//! funding_scout --use-sample-data --idea "AI bookkeeping for freelancers"
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: each source is probed, fetched and parsed into records
//! 2. **Aggregation**: records from all sources form the corpus
//! 3. **Analysis**: market analysis, idea generation, competitive analysis
//! 4. **Output**: JSON report, Markdown report, ideas export

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod error;
mod extract;
mod http;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use api::{AwfulJadeGenerator, Generator, OllamaGenerator, RetryAsk, TimeoutAsk};
use cli::{Backend, Cli};
use http::HttpFetcher;
use models::Report;
use outputs::{export, json, markdown};
use pipeline::{AnalysisPipeline, IdeaRequest};
use scrapers::{Aggregator, SourceScraper};
use utils::ensure_writable_dir;

/// First retry of a failed generation call waits this long.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse CLI first so --debug can pick the default filter
    let args = Cli::parse();

    // --- Tracing init ---
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "funding_scout starting up");
    debug!(?args, "Parsed CLI arguments");

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Generator ----
    let generator = match args.backend {
        Backend::Ollama => Generator::Ollama(OllamaGenerator::new(&args.ollama_url, &args.model)?),
        Backend::AwfulJade => Generator::AwfulJade(
            AwfulJadeGenerator::load(args.awful_config.as_deref(), &args.template).await?,
        ),
    };
    let model = generator.describe();
    info!(%model, "Generator ready");
    let generator = RetryAsk::new(
        TimeoutAsk::new(generator, Duration::from_secs(args.generator_timeout_secs)),
        args.generator_retries,
        RETRY_BASE_DELAY,
    );
    let pipeline = AnalysisPipeline::new(generator);

    // ---- Sources ----
    let source_configs = match &args.sources {
        Some(path) => scrapers::load_sources(path).await?,
        None => scrapers::default_sources(),
    };
    let source_scrapers = source_configs
        .into_iter()
        .map(SourceScraper::new)
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        sources = source_scrapers.len(),
        labels = ?source_scrapers.iter().map(SourceScraper::label).collect::<Vec<_>>(),
        "Sources configured"
    );

    // ---- Scrape ----
    let fetcher = HttpFetcher::new()?;
    let corpus = Aggregator::new(&fetcher, &source_scrapers)
        .with_source_delay(Duration::from_millis(args.source_delay_ms))
        .with_parallel(args.parallel_sources)
        .aggregate(usize::from(args.num_articles), args.use_sample_data)
        .await;
    info!(count = corpus.len(), sources = ?corpus.source_counts(), "Corpus ready");

    let now = Local::now();
    let local_date = now.format("%Y-%m-%d").to_string();
    let local_time = now.format("%H:%M:%S").to_string();

    // ---- Custom idea mode ----
    if let Some(idea) = args.idea.as_deref() {
        let analysis = match pipeline.analyze_idea(idea, &corpus).await {
            Ok(text) => text,
            Err(e) => {
                error!(stage = %e.stage, error = %e.source, "Idea analysis failed; is the generator running? Try --use-sample-data to rule out scraping");
                return Err(e.into());
            }
        };
        println!("{}", analysis.trim());
        if let Err(e) =
            export::write_idea_analysis(idea, &analysis, &args.output_dir, &local_date).await
        {
            error!(error = %e, "Failed to export idea analysis");
        }
        log_elapsed(start_time);
        return Ok(());
    }

    // ---- Full analysis ----
    let request = IdeaRequest {
        focus_area: args.focus_area,
        additional_context: args.context.clone(),
    };
    let result = match pipeline.run(corpus, &request).await {
        Ok(result) => result,
        Err(e) => {
            error!(
                stage = %e.stage,
                error = %e.source,
                "Analysis failed; check the generator and retry, or use --use-sample-data"
            );
            return Err(e.into());
        }
    };

    let report = Report {
        local_date,
        local_time,
        model,
        focus_area: args.focus_area,
        result,
    };

    // ---- Outputs ----
    if let Err(e) = json::write_report(&report, &args.output_dir).await {
        error!(error = %e, "Failed to write JSON report");
    }

    match markdown::write_report(&report, &args.output_dir).await {
        Ok(path) => println!("Report written to {}", path.display()),
        Err(e) => error!(error = %e, "Failed to write Markdown report"),
    }

    if report.result.startup_ideas.trim().is_empty() {
        warn!("Generator returned no idea text; skipping ideas export");
    } else if let Err(e) =
        export::write_ideas(&report.result.startup_ideas, &args.output_dir, &report.local_date)
            .await
    {
        error!(error = %e, "Failed to export startup ideas");
    }

    log_elapsed(start_time);
    Ok(())
}

fn log_elapsed(start_time: std::time::Instant) {
    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}
