//! Data models shared by the scrapers, the analysis pipeline and the outputs.
//!
//! - [`ArticleRecord`]: one extracted (or sample) funding news item
//! - [`Corpus`]: the ordered records of one aggregation run
//! - [`AnalysisResult`]: the three generated texts plus the corpus they came from
//! - [`Report`]: what gets written to disk for one run

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// A single funding news item.
///
/// Records are created by the extractor or the sample data provider and never
/// modified afterwards. `published_at` is kept exactly as found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Headline text, never empty.
    pub title: String,
    /// Absolute URL of the article.
    pub link: String,
    /// First paragraph, cut to 200 characters plus `...`, or empty.
    pub excerpt: String,
    /// Raw date token, e.g. `2024-01-15T10:00:00Z` or `Jan 15, 2024`.
    pub published_at: String,
    /// Label of the site the record came from.
    pub source: String,
}

/// The ordered article collection produced by one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Corpus(Vec<ArticleRecord>);

impl Corpus {
    pub fn new(articles: Vec<ArticleRecord>) -> Self {
        Self(articles)
    }

    pub fn articles(&self) -> &[ArticleRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the corpus in the block format every analysis prompt expects.
    ///
    /// ```text
    ///
    /// ARTICLE 1:
    /// Title: ...
    /// Source: ...
    /// Date: ...
    /// Link: ...
    /// Content: ...
    ///
    /// ---
    /// ```
    pub fn format_for_analysis(&self) -> String {
        let mut out = String::new();
        for (i, article) in self.0.iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "\nARTICLE {}:\nTitle: {}\nSource: {}\nDate: {}\nLink: {}\nContent: {}\n\n---\n",
                i + 1,
                article.title,
                article.source,
                article.published_at,
                article.link,
                article.excerpt
            );
        }
        out
    }

    /// Number of articles per source, in order of first appearance.
    pub fn source_counts(&self) -> Vec<(String, usize)> {
        let counts = self.0.iter().counts_by(|a| a.source.as_str());
        self.0
            .iter()
            .map(|a| a.source.as_str())
            .unique()
            .map(|source| (source.to_string(), counts[source]))
            .collect()
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisResult {
    pub market_analysis: String,
    pub startup_ideas: String,
    pub competitive_analysis: String,
    pub corpus: Corpus,
}

/// Sector the idea generation stage should concentrate on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
pub enum FocusArea {
    /// No restriction.
    #[default]
    All,
    AiMl,
    Fintech,
    Healthcare,
    Ecommerce,
    SaasB2b,
    ConsumerApps,
    ClimateTech,
    Edtech,
    Proptech,
    Web3Crypto,
    Gaming,
    IotHardware,
}

impl FocusArea {
    pub fn label(self) -> &'static str {
        match self {
            FocusArea::All => "All Sectors",
            FocusArea::AiMl => "AI/Machine Learning",
            FocusArea::Fintech => "Fintech",
            FocusArea::Healthcare => "Healthcare",
            FocusArea::Ecommerce => "E-commerce",
            FocusArea::SaasB2b => "SaaS/B2B",
            FocusArea::ConsumerApps => "Consumer Apps",
            FocusArea::ClimateTech => "Climate Tech",
            FocusArea::Edtech => "EdTech",
            FocusArea::Proptech => "PropTech",
            FocusArea::Web3Crypto => "Web3/Crypto",
            FocusArea::Gaming => "Gaming",
            FocusArea::IotHardware => "IoT/Hardware",
        }
    }

    /// The text handed to the idea generation prompt; empty for [`FocusArea::All`].
    pub fn prompt_context(self) -> String {
        match self {
            FocusArea::All => String::new(),
            other => format!("Focus on {}", other.label()),
        }
    }
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One run as written to disk.
#[derive(Debug, Deserialize, Serialize)]
pub struct Report {
    /// Date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// Time of the run in `HH:MM:SS` format.
    pub local_time: String,
    /// Generator backend and model that produced the texts.
    pub model: String,
    pub focus_area: FocusArea,
    pub result: AnalysisResult,
}
