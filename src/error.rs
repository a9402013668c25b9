//! Error taxonomy for scraping, extraction, generation and configuration.
//!
//! Only [`PipelineError`] and [`ConfigurationError`] ever reach `main`.
//! [`FetchError`] is absorbed by the source scrapers and
//! [`ExtractionElementError`] by the extractor, one element at a time.

use std::fmt;
use thiserror::Error;

/// A single page fetch failed. Recovered by trying the next candidate URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Why a candidate element did not become an article.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionElementError {
    #[error("no title element found")]
    NoTitleElement,
    #[error("no anchor found")]
    NoAnchor,
    #[error("title text is empty")]
    EmptyTitle,
    #[error("anchor has no href")]
    EmptyLink,
    #[error("link {0:?} cannot be resolved against the page URL")]
    UnresolvableLink(String),
    #[error("headline has no funding keyword")]
    Irrelevant,
    #[error("link {0} already extracted")]
    Duplicate(String),
}

/// A Generator call failed.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generator answered with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generator returned an unreadable response: {0}")]
    Decode(String),

    #[error("generator did not answer within {0} seconds")]
    Timeout(u64),

    #[error("generator backend error: {0}")]
    Backend(String),
}

/// Startup problems. The run cannot proceed past these.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("selector {selector:?} of source {source_label} is not valid CSS: {reason}")]
    InvalidSelector {
        source_label: String,
        selector: String,
        reason: String,
    },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("no generator available: {0}")]
    Generator(String),

    #[error("could not load source definitions from {path}: {reason}")]
    SourcesFile { path: String, reason: String },
}

/// The pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MarketAnalysis,
    IdeaGeneration,
    CompetitiveAnalysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::MarketAnalysis => "market analysis",
            Stage::IdeaGeneration => "idea generation",
            Stage::CompetitiveAnalysis => "competitive analysis",
        };
        f.write_str(name)
    }
}

/// A generator failure tagged with the stage that was running.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: GenerationError,
}
