//! Built-in sample funding articles.
//!
//! Used when the user asks to skip scraping and whenever every source came
//! back empty, so the analysis stages always have something to work with.

use crate::models::{ArticleRecord, Corpus};

/// Bump when the sample set changes.
pub const SAMPLE_DATA_VERSION: u32 = 1;

/// `source` label of every sample record.
pub const SAMPLE_SOURCE: &str = "Sample Data";

/// The fixed sample dataset.
pub fn funding_articles() -> Vec<ArticleRecord> {
    let sample = |title: &str, slug: &str, excerpt: &str, date: &str| ArticleRecord {
        title: title.to_string(),
        link: format!("https://example.com/{}", slug),
        excerpt: excerpt.to_string(),
        published_at: date.to_string(),
        source: SAMPLE_SOURCE.to_string(),
    };

    vec![
        sample(
            "AI Startup Anthropic Raises $300M Series C for Constitutional AI Research",
            "anthropic-funding",
            "Anthropic, the AI safety company, has raised $300 million in Series C funding to advance research in Constitutional AI and safety-focused language models...",
            "2024-01-15",
        ),
        sample(
            "FinTech Startup Brex Secures $200M to Expand Corporate Credit Solutions",
            "brex-funding",
            "Corporate credit card company Brex announced a $200 million funding round to expand its financial services platform for startups and enterprises...",
            "2024-01-14",
        ),
        sample(
            "HealthTech Company Ro Raises $150M Series D for Telehealth Platform",
            "ro-funding",
            "Digital health platform Ro has secured $150 million in Series D funding to expand its telehealth services and direct-to-consumer healthcare model...",
            "2024-01-13",
        ),
        sample(
            "E-commerce Analytics Startup Triple Whale Gets $50M Series B",
            "triple-whale-funding",
            "E-commerce analytics platform Triple Whale raised $50 million in Series B funding to help online retailers optimize their marketing and operations...",
            "2024-01-12",
        ),
        sample(
            "Climate Tech Startup Watershed Raises $100M for Carbon Management",
            "watershed-funding",
            "Carbon accounting platform Watershed secured $100 million to help enterprises measure and reduce their carbon footprint through advanced analytics...",
            "2024-01-11",
        ),
    ]
}

pub fn corpus() -> Corpus {
    Corpus::new(funding_articles())
}
