//! VentureBeat source definition.
//!
//! VentureBeat is the secondary source: it gets half the article budget,
//! never more than five, and a narrower keyword list.

use super::SourceConfig;

pub const LABEL: &str = "VentureBeat";

pub fn config() -> SourceConfig {
    SourceConfig {
        label: LABEL.to_string(),
        candidate_urls: vec![
            "https://venturebeat.com/category/deals/".to_string(),
            "https://venturebeat.com/tag/funding/".to_string(),
            "https://venturebeat.com/".to_string(),
        ],
        selector_strategies: vec![
            "article".to_string(),
            r#"div[class*="post"]"#.to_string(),
            "h2".to_string(),
        ],
        headings: vec!["h1".to_string(), "h2".to_string(), "h3".to_string()],
        keywords: [
            "funding",
            "raises",
            "investment",
            "series",
            "million",
            "startup",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect(),
        limit_divisor: 2,
        limit_cap: Some(5),
    }
}
